use std::sync::Arc;

use tracing::debug;
use wsp_core::{PageId, SyncEngineStep};
use wsp_live::LiveData;
use wsp_workspace::{LocalState, Workspace};

use crate::record::PageRecord;

/// Live list of page records for a workspace, plus its sync readiness.
///
/// Nothing is registered on the workspace until someone subscribes. Each live value holds
/// at most one registration, shared by all of its subscribers and released when the last
/// one leaves.
pub struct PageRecordList {
    workspace: Arc<dyn Workspace>,
    local_state: Arc<dyn LocalState>,
    records: LiveData<Vec<PageRecord>>,
    is_ready: LiveData<bool>,
    sync_step: LiveData<SyncEngineStep>,
}

impl PageRecordList {
    pub fn new(workspace: Arc<dyn Workspace>, local_state: Arc<dyn LocalState>) -> Self {
        let records = {
            let (ws, registry, state) = (workspace.clone(), workspace.clone(), local_state.clone());
            LiveData::from_notifications(
                Vec::new(),
                move || build_records(&ws, &state),
                move |cb| registry.on_page_metas_updated(cb),
            )
            .labeled("records")
        };

        let is_ready = {
            let (ws, registry) = (workspace.clone(), workspace.clone());
            LiveData::from_notifications(
                false,
                move || ws.sync_status().step == SyncEngineStep::Synced,
                move |cb| registry.on_status_change(cb),
            )
            .labeled("is_ready")
        };

        let sync_step = {
            let (ws, registry) = (workspace.clone(), workspace.clone());
            LiveData::from_notifications(
                SyncEngineStep::default(),
                move || ws.sync_status().step,
                move |cb| registry.on_status_change(cb),
            )
            .labeled("sync_step")
        };

        Self { workspace, local_state, records, is_ready, sync_step }
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    pub fn local_state(&self) -> &Arc<dyn LocalState> {
        &self.local_state
    }

    /// One record per metadata entry, in collection order. Replaced wholesale on every
    /// metadata change.
    pub fn records(&self) -> LiveData<Vec<PageRecord>> {
        self.records.clone()
    }

    /// True iff the sync engine reports `Synced`.
    pub fn is_ready(&self) -> LiveData<bool> {
        self.is_ready.clone()
    }

    /// The raw sync step, for callers that care about states short of `Synced`.
    pub fn sync_step(&self) -> LiveData<SyncEngineStep> {
        self.sync_step.clone()
    }

    pub fn ids(&self) -> LiveData<Vec<PageId>> {
        self.records.map(|records| records.iter().map(|r| r.id().clone()).collect())
    }

    /// First record with exactly this id, or `None`.
    pub fn record(&self, id: impl Into<PageId>) -> LiveData<Option<PageRecord>> {
        let id = id.into();
        self.records.map(move |records| records.iter().find(|r| *r.id() == id).cloned())
    }
}

fn build_records(workspace: &Arc<dyn Workspace>, local_state: &Arc<dyn LocalState>) -> Vec<PageRecord> {
    let records: Vec<PageRecord> = workspace
        .page_metas()
        .into_iter()
        .map(|meta| PageRecord::new(meta.id, workspace.clone(), local_state.clone()))
        .collect();
    debug!(workspace = %workspace.id(), count = records.len(), "page records recomputed");
    records
}
