use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;
use wsp_core::{
    now_unix, Page, PageId, PageMeta, PageMetaPatch, SyncEngineStatus, SyncEngineStep, WorkspaceError, WorkspaceId,
};
use wsp_live::{Callback, Disposer, Notifier};

use crate::traits::{KeyCallback, LocalState, PageCallback, Workspace};

/// In-memory workspace. Backs tests and the CLI (which persists it as JSON).
///
/// Mutations notify `page_added` / `page_removed` first and `page_metas_updated` last,
/// always after the internal lock has been released.
pub struct InMemoryWorkspace {
    id: WorkspaceId,
    inner: Mutex<Inner>,
    metas_updated: Notifier<()>,
    page_added: Notifier<PageId>,
    page_removed: Notifier<PageId>,
    status_changed: Notifier<()>,
}

#[derive(Default)]
struct Inner {
    metas: Vec<PageMeta>,
    loaded: HashSet<PageId>,
    status: SyncEngineStatus,
}

impl InMemoryWorkspace {
    pub fn new(id: WorkspaceId) -> Self {
        Self::with_pages(id, vec![])
    }

    /// Seed the collection as-is; duplicate ids are kept.
    pub fn with_pages(id: WorkspaceId, metas: Vec<PageMeta>) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner { metas, ..Inner::default() }),
            metas_updated: Notifier::new(),
            page_added: Notifier::new(),
            page_removed: Notifier::new(),
            status_changed: Notifier::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_page(&self, meta: PageMeta) -> Result<(), WorkspaceError> {
        {
            let mut inner = self.lock();
            if inner.metas.iter().any(|m| m.id == meta.id) {
                return Err(WorkspaceError::DuplicatePage(meta.id));
            }
            inner.metas.push(meta.clone());
        }
        debug!(workspace = %self.id, page = %meta.id, "page added");
        self.page_added.emit(&meta.id);
        self.metas_updated.emit(&());
        Ok(())
    }

    /// Appends without the duplicate check. Only for reproducing malformed collections.
    pub fn insert_page_meta_unchecked(&self, meta: PageMeta) {
        self.lock().metas.push(meta.clone());
        self.page_added.emit(&meta.id);
        self.metas_updated.emit(&());
    }

    /// Removes the first entry with this id.
    pub fn remove_page(&self, id: &PageId) -> Result<PageMeta, WorkspaceError> {
        let removed = {
            let mut inner = self.lock();
            let pos = inner
                .metas
                .iter()
                .position(|m| m.id == *id)
                .ok_or_else(|| WorkspaceError::PageNotFound(id.clone()))?;
            let removed = inner.metas.remove(pos);
            if !inner.metas.iter().any(|m| m.id == *id) {
                inner.loaded.remove(id);
            }
            removed
        };
        debug!(workspace = %self.id, page = %id, "page removed");
        self.page_removed.emit(id);
        self.metas_updated.emit(&());
        Ok(removed)
    }

    pub fn set_sync_status(&self, status: SyncEngineStatus) {
        {
            let mut inner = self.lock();
            if inner.status == status {
                return;
            }
            inner.status = status.clone();
        }
        debug!(workspace = %self.id, step = status.step.as_str(), "sync status changed");
        self.status_changed.emit(&());
    }

    pub fn set_sync_step(&self, step: SyncEngineStep) {
        let mut status = self.sync_status();
        status.step = step;
        self.set_sync_status(status);
    }

    /// Fires `page_metas_updated` without changing anything.
    pub fn touch(&self) {
        self.metas_updated.emit(&());
    }

    pub fn metas_listener_count(&self) -> usize {
        self.metas_updated.listener_count()
    }

    pub fn status_listener_count(&self) -> usize {
        self.status_changed.listener_count()
    }
}

impl Workspace for InMemoryWorkspace {
    fn id(&self) -> &WorkspaceId {
        &self.id
    }

    fn page_metas(&self) -> Vec<PageMeta> {
        self.lock().metas.clone()
    }

    fn on_page_metas_updated(&self, handler: Callback) -> Disposer {
        self.metas_updated.on(move |_| handler())
    }

    fn update_page_meta(&self, id: &PageId, patch: PageMetaPatch) -> Result<(), WorkspaceError> {
        let changed = {
            let mut inner = self.lock();
            let meta = inner
                .metas
                .iter_mut()
                .find(|m| m.id == *id)
                .ok_or_else(|| WorkspaceError::PageNotFound(id.clone()))?;
            meta.apply(&patch, now_unix())
        };
        if changed {
            self.metas_updated.emit(&());
        }
        Ok(())
    }

    fn page(&self, id: &PageId) -> Option<Page> {
        let inner = self.lock();
        if !inner.metas.iter().any(|m| m.id == *id) {
            return None;
        }
        Some(Page { id: id.clone(), loaded: inner.loaded.contains(id) })
    }

    fn load_page(&self, id: &PageId) -> Result<(), WorkspaceError> {
        let mut inner = self.lock();
        if !inner.metas.iter().any(|m| m.id == *id) {
            return Err(WorkspaceError::PageNotFound(id.clone()));
        }
        inner.loaded.insert(id.clone());
        Ok(())
    }

    fn on_page_added(&self, handler: PageCallback) -> Disposer {
        self.page_added.on(move |id| handler(id))
    }

    fn on_page_removed(&self, handler: PageCallback) -> Disposer {
        self.page_removed.on(move |id| handler(id))
    }

    fn sync_status(&self) -> SyncEngineStatus {
        self.lock().status.clone()
    }

    fn on_status_change(&self, handler: Callback) -> Disposer {
        self.status_changed.on(move |_| handler())
    }
}

/// HashMap-backed local state for tests.
#[derive(Default)]
pub struct InMemoryLocalState {
    values: Mutex<HashMap<String, Value>>,
    changed: Notifier<String>,
}

impl InMemoryLocalState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalState for InMemoryLocalState {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<Value>) -> anyhow::Result<()> {
        {
            let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
            match value {
                Some(v) => {
                    values.insert(key.to_string(), v);
                }
                None => {
                    values.remove(key);
                }
            }
        }
        self.changed.emit(&key.to_string());
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut keys: Vec<String> = self.values.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn on_change(&self, handler: KeyCallback) -> Disposer {
        self.changed.on(move |key: &String| handler(key.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ws() -> InMemoryWorkspace {
        InMemoryWorkspace::new(WorkspaceId::from_str("ws1"))
    }

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let n = Arc::new(AtomicUsize::new(0));
        let c = n.clone();
        (n, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_new_workspace_is_empty_and_stopped() {
        let ws = ws();
        assert!(ws.page_metas().is_empty());
        assert_eq!(ws.sync_status().step, SyncEngineStep::Stopped);
        assert_eq!(ws.id().as_str(), "ws1");
    }

    #[test]
    fn test_add_page_notifies_and_rejects_duplicates() {
        let ws = ws();
        let (n, cb) = counter();
        let _d = ws.on_page_metas_updated(cb);
        ws.add_page(PageMeta::new("a", "A", 0)).unwrap();
        assert_eq!(n.load(Ordering::SeqCst), 1);

        let err = ws.add_page(PageMeta::new("a", "again", 0)).unwrap_err();
        assert_eq!(err, WorkspaceError::DuplicatePage(PageId::from_str("a")));
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert_eq!(ws.page_metas().len(), 1);
    }

    #[test]
    fn test_page_metas_keep_insertion_order() {
        let ws = ws();
        for id in ["c", "a", "b"] {
            ws.add_page(PageMeta::new(id, id, 0)).unwrap();
        }
        let ids: Vec<String> = ws.page_metas().into_iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_missing_page() {
        let ws = ws();
        let err = ws.remove_page(&PageId::from_str("nope")).unwrap_err();
        assert_eq!(err, WorkspaceError::PageNotFound(PageId::from_str("nope")));
    }

    #[test]
    fn test_added_and_removed_events_carry_id() {
        let ws = ws();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, r) = (seen.clone(), seen.clone());
        let _da = ws.on_page_added(Box::new(move |id: &PageId| a.lock().unwrap().push(format!("+{id}"))));
        let _dr = ws.on_page_removed(Box::new(move |id: &PageId| r.lock().unwrap().push(format!("-{id}"))));
        ws.add_page(PageMeta::new("p", "P", 0)).unwrap();
        ws.remove_page(&PageId::from_str("p")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["+p", "-p"]);
    }

    #[test]
    fn test_update_meta_notifies_only_on_change() {
        let ws = ws();
        ws.add_page(PageMeta::new("p", "P", 0)).unwrap();
        let (n, cb) = counter();
        let _d = ws.on_page_metas_updated(cb);
        let id = PageId::from_str("p");
        ws.update_page_meta(&id, PageMetaPatch::title("P")).unwrap();
        assert_eq!(n.load(Ordering::SeqCst), 0);
        ws.update_page_meta(&id, PageMetaPatch::title("Q")).unwrap();
        assert_eq!(n.load(Ordering::SeqCst), 1);
        assert_eq!(ws.page_meta(&id).unwrap().title, "Q");
        assert!(ws.update_page_meta(&PageId::from_str("x"), PageMetaPatch::default()).is_err());
    }

    #[test]
    fn test_status_change_notifies_once_per_change() {
        let ws = ws();
        let (n, cb) = counter();
        let d = ws.on_status_change(cb);
        ws.set_sync_step(SyncEngineStep::Syncing);
        ws.set_sync_step(SyncEngineStep::Syncing);
        ws.set_sync_step(SyncEngineStep::Synced);
        assert_eq!(n.load(Ordering::SeqCst), 2);
        assert_eq!(ws.status_listener_count(), 1);
        drop(d);
        assert_eq!(ws.status_listener_count(), 0);
    }

    #[test]
    fn test_load_page() {
        let ws = ws();
        let id = PageId::from_str("p");
        assert!(ws.page(&id).is_none());
        assert!(ws.load_page(&id).is_err());
        ws.add_page(PageMeta::new("p", "P", 0)).unwrap();
        assert_eq!(ws.page(&id), Some(Page { id: id.clone(), loaded: false }));
        ws.load_page(&id).unwrap();
        assert!(ws.page(&id).unwrap().loaded);
        ws.remove_page(&id).unwrap();
        assert!(ws.page(&id).is_none());
    }

    #[test]
    fn test_local_state_set_get_remove() {
        let state = InMemoryLocalState::new();
        let keys = Arc::new(Mutex::new(Vec::new()));
        let k = keys.clone();
        let _d = state.on_change(Box::new(move |key: &str| k.lock().unwrap().push(key.to_string())));

        state.set("b", Some(json!(1))).unwrap();
        state.set("a", Some(json!("x"))).unwrap();
        assert_eq!(state.get("a").unwrap(), Some(json!("x")));
        assert_eq!(state.keys().unwrap(), vec!["a", "b"]);

        state.set("a", None).unwrap();
        assert_eq!(state.get("a").unwrap(), None);
        assert_eq!(*keys.lock().unwrap(), vec!["b", "a", "a"]);
    }
}
