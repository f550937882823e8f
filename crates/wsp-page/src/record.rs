use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use wsp_core::{PageId, PageMeta, PageMetaPatch, PageMode, WorkspaceError};
use wsp_live::LiveData;
use wsp_workspace::{LocalState, Workspace};

/// Lightweight view of one page. Cheap to rebuild; carries no state of its own beyond
/// the id and the two shared handles.
#[derive(Clone)]
pub struct PageRecord {
    id: PageId,
    workspace: Arc<dyn Workspace>,
    local_state: Arc<dyn LocalState>,
}

impl PageRecord {
    pub fn new(id: PageId, workspace: Arc<dyn Workspace>, local_state: Arc<dyn LocalState>) -> Self {
        Self { id, workspace, local_state }
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    pub fn local_state(&self) -> &Arc<dyn LocalState> {
        &self.local_state
    }

    /// Live metadata for this page; `None` once the page is gone.
    pub fn meta(&self) -> LiveData<Option<PageMeta>> {
        let (ws, registry) = (self.workspace.clone(), self.workspace.clone());
        let id = self.id.clone();
        LiveData::from_notifications(None, move || ws.page_meta(&id), move |cb| registry.on_page_metas_updated(cb))
            .labeled("page_meta")
    }

    pub fn title(&self) -> LiveData<String> {
        self.meta().map(|meta| meta.as_ref().map(|m| m.title.clone()).unwrap_or_default())
    }

    pub fn set_meta(&self, patch: PageMetaPatch) -> Result<(), WorkspaceError> {
        self.workspace.update_page_meta(&self.id, patch)
    }

    pub fn mode(&self) -> LiveData<PageMode> {
        let (state, registry) = (self.local_state.clone(), self.local_state.clone());
        let key = mode_key(&self.id);
        let watched = key.clone();
        LiveData::from_notifications(
            PageMode::default(),
            move || read_mode(state.as_ref(), &key),
            move |cb| {
                let watched = watched.clone();
                registry.on_change(Box::new(move |changed: &str| {
                    if changed == watched {
                        cb();
                    }
                }))
            },
        )
        .labeled("page_mode")
    }

    pub fn get_mode(&self) -> PageMode {
        read_mode(self.local_state.as_ref(), &mode_key(&self.id))
    }

    pub fn set_mode(&self, mode: PageMode) -> Result<()> {
        self.local_state.set(&mode_key(&self.id), Some(serde_json::to_value(mode)?))
    }

    pub fn toggle_mode(&self) -> Result<PageMode> {
        let next = self.get_mode().toggled();
        self.set_mode(next)?;
        Ok(next)
    }
}

impl fmt::Debug for PageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRecord").field("id", &self.id).field("workspace", self.workspace.id()).finish()
    }
}

pub fn mode_key(id: &PageId) -> String {
    format!("page:{}:mode", id.as_str())
}

/// Missing or unreadable values fall back to the default mode.
fn read_mode(state: &dyn LocalState, key: &str) -> PageMode {
    match state.get(key) {
        Ok(None) => PageMode::default(),
        Ok(Some(value)) => serde_json::from_value(value.clone()).unwrap_or_else(|_| {
            warn!(key, %value, "unrecognized page mode, using default");
            PageMode::default()
        }),
        Err(err) => {
            warn!(key, error = %err, "failed to read page mode, using default");
            PageMode::default()
        }
    }
}
