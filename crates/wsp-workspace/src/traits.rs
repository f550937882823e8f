use serde_json::Value;
use wsp_core::{Page, PageId, PageMeta, PageMetaPatch, SyncEngineStatus, WorkspaceError, WorkspaceId};
use wsp_live::{Callback, Disposer};

pub type PageCallback = Box<dyn Fn(&PageId) + Send + Sync>;
pub type KeyCallback = Box<dyn Fn(&str) + Send + Sync>;

/// The document store a set of pages lives in, plus the status of its sync engine.
///
/// Every `on_*` registration stays active until the returned disposer is disposed or dropped.
pub trait Workspace: Send + Sync {
    fn id(&self) -> &WorkspaceId;

    /// Snapshot of the page-metadata collection, in collection order.
    fn page_metas(&self) -> Vec<PageMeta>;
    fn on_page_metas_updated(&self, handler: Callback) -> Disposer;

    fn page_meta(&self, id: &PageId) -> Option<PageMeta> {
        self.page_metas().into_iter().find(|m| m.id == *id)
    }
    fn update_page_meta(&self, id: &PageId, patch: PageMetaPatch) -> Result<(), WorkspaceError>;

    fn page(&self, id: &PageId) -> Option<Page>;
    fn load_page(&self, id: &PageId) -> Result<(), WorkspaceError>;
    fn on_page_added(&self, handler: PageCallback) -> Disposer;
    fn on_page_removed(&self, handler: PageCallback) -> Disposer;

    fn sync_status(&self) -> SyncEngineStatus;
    fn on_status_change(&self, handler: Callback) -> Disposer;
}

/// Per-workspace key/value state that stays on this device.
pub trait LocalState: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// `None` removes the key.
    fn set(&self, key: &str, value: Option<Value>) -> anyhow::Result<()>;

    fn keys(&self) -> anyhow::Result<Vec<String>>;

    /// Called with the key after every successful `set`.
    fn on_change(&self, handler: KeyCallback) -> Disposer;
}
