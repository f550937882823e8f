use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wsp_core::{PageMeta, SyncEngineStatus, WorkspaceId};
use wsp_workspace::{InMemoryWorkspace, Workspace};

/// On-disk form of a workspace: its page metadata in collection order plus the last
/// known sync status.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub pages: Vec<PageMeta>,
    #[serde(default)]
    pub sync: SyncEngineStatus,
}

impl WorkspaceFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let file: Self = serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn snapshot(workspace: &InMemoryWorkspace) -> Self {
        Self { pages: workspace.page_metas(), sync: workspace.sync_status() }
    }

    pub fn into_workspace(self, id: WorkspaceId) -> InMemoryWorkspace {
        let ws = InMemoryWorkspace::with_pages(id, self.pages);
        ws.set_sync_status(self.sync);
        ws
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wsp_core::SyncEngineStep;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = WorkspaceFile::load(&dir.path().join("nope.json")).unwrap();
        assert!(file.pages.is_empty());
        assert_eq!(file.sync.step, SyncEngineStep::Stopped);
    }

    #[test]
    fn workspace_roundtrip_keeps_order_and_status() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".wsp").join("workspace.json");
        let ws = InMemoryWorkspace::new(WorkspaceId::from_str("w"));
        ws.add_page(PageMeta::new("b", "B", 1)).unwrap();
        ws.add_page(PageMeta::new("a", "A", 2)).unwrap();
        ws.set_sync_step(SyncEngineStep::Synced);
        WorkspaceFile::snapshot(&ws).save(&path).unwrap();

        let restored = WorkspaceFile::load(&path).unwrap().into_workspace(WorkspaceId::from_str("w"));
        let ids: Vec<String> = restored.page_metas().into_iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(restored.sync_status().step, SyncEngineStep::Synced);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(WorkspaceFile::load(&path).is_err());
    }
}
