use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use wsp_core::{now_unix, PageId, PageMeta, PageMetaPatch, PageMode, SyncEngineStep, WorkspaceId};
use wsp_page::{PageRecord, PageRecordList};
use wsp_state_sqlite::SqliteLocalState;
use wsp_workspace::{InMemoryWorkspace, Workspace};

use crate::{Config, WorkspaceFile};

/// Everything the CLI needs for one repo: config, the workspace loaded from disk, the
/// device-local state and a record list over both.
pub struct Session {
    pub repo_root: PathBuf,
    pub cfg: Config,
    pub workspace: Arc<InMemoryWorkspace>,
    pub local_state: Arc<SqliteLocalState>,
    pub pages: PageRecordList,
}

/// One line of `wsp status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSummary {
    pub id: PageId,
    pub title: String,
    pub mode: PageMode,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct StatusReport {
    pub workspace_id: WorkspaceId,
    pub ready: bool,
    pub step: SyncEngineStep,
    pub pages: Vec<PageSummary>,
}

impl Session {
    pub fn init_repo(repo_root: &Path) -> Result<()> {
        let cfg = ensure_config(repo_root)?;
        let metadata_path = cfg.metadata_path(repo_root);
        if !metadata_path.exists() {
            WorkspaceFile::default().save(&metadata_path)?;
        }
        // create db
        let _ = SqliteLocalState::open(&cfg.db_path(repo_root))?;
        Ok(())
    }

    pub fn open(repo_root: PathBuf) -> Result<Self> {
        let cfg = ensure_config(&repo_root)?;
        let file = WorkspaceFile::load(&cfg.metadata_path(&repo_root))?;
        let workspace = Arc::new(file.into_workspace(WorkspaceId::from_str(cfg.workspace.id.clone())));
        let local_state = Arc::new(SqliteLocalState::open(&cfg.db_path(&repo_root))?);
        let pages = PageRecordList::new(workspace.clone(), local_state.clone());
        info!(workspace = %workspace.id(), pages = workspace.page_metas().len(), "session opened");

        Ok(Self { repo_root, cfg, workspace, local_state, pages })
    }

    /// Writes the workspace back to its metadata file.
    pub fn save(&self) -> Result<()> {
        WorkspaceFile::snapshot(&self.workspace).save(&self.cfg.metadata_path(&self.repo_root))
    }

    pub fn add_page(&self, id: &str, title: &str, tags: Vec<String>) -> Result<()> {
        let mut meta = PageMeta::new(id, title, now_unix());
        meta.tags = tags;
        self.workspace.add_page(meta)?;
        self.save()
    }

    pub fn remove_page(&self, id: &str) -> Result<()> {
        self.workspace.remove_page(&PageId::from_str(id))?;
        self.save()
    }

    pub fn rename_page(&self, id: &str, title: &str) -> Result<()> {
        let record = self.record(id)?;
        record.set_meta(PageMetaPatch::title(title))?;
        self.save()
    }

    pub fn set_sync_step(&self, step: SyncEngineStep) -> Result<()> {
        self.workspace.set_sync_step(step);
        self.save()
    }

    /// Looks the page up through the record list.
    pub fn record(&self, id: &str) -> Result<PageRecord> {
        self.pages.record(id).value().ok_or_else(|| anyhow!("no page with id {id}"))
    }

    pub fn set_mode(&self, id: &str, mode: PageMode) -> Result<()> {
        self.record(id)?.set_mode(mode)
    }

    pub fn toggle_mode(&self, id: &str) -> Result<PageMode> {
        self.record(id)?.toggle_mode()
    }

    pub fn status(&self) -> StatusReport {
        let pages = self
            .pages
            .records()
            .value()
            .iter()
            .map(|record| {
                let meta = self.workspace.page_meta(record.id());
                PageSummary {
                    id: record.id().clone(),
                    title: meta.as_ref().map(|m| m.title.clone()).unwrap_or_default(),
                    mode: record.get_mode(),
                    tags: meta.map(|m| m.tags).unwrap_or_default(),
                }
            })
            .collect();
        StatusReport {
            workspace_id: self.workspace.id().clone(),
            ready: self.pages.is_ready().value(),
            step: self.pages.sync_step().value(),
            pages,
        }
    }
}

fn ensure_config(repo_root: &Path) -> Result<Config> {
    let cfg_path = Config::config_path(repo_root);
    if cfg_path.exists() {
        return Config::load_from(&cfg_path);
    }
    let cfg = Config::load_or_default(repo_root)?;
    cfg.save_to(&cfg_path)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_layout() {
        let dir = tempdir().unwrap();
        Session::init_repo(dir.path()).unwrap();
        assert!(dir.path().join(".wsp").join("wsp.toml").exists());
        assert!(dir.path().join(".wsp").join("workspace.json").exists());
        assert!(dir.path().join(".wsp").join("state.db").exists());
    }

    #[test]
    fn pages_persist_across_sessions() {
        let dir = tempdir().unwrap();
        Session::init_repo(dir.path()).unwrap();
        {
            let s = Session::open(dir.path().to_path_buf()).unwrap();
            s.add_page("a", "Alpha", vec!["x".into()]).unwrap();
            s.add_page("b", "Beta", vec![]).unwrap();
            s.rename_page("b", "Bravo").unwrap();
            s.remove_page("a").unwrap();
            s.set_sync_step(SyncEngineStep::Synced).unwrap();
            s.toggle_mode("b").unwrap();
        }
        let s = Session::open(dir.path().to_path_buf()).unwrap();
        let report = s.status();
        assert!(report.ready);
        assert_eq!(report.step, SyncEngineStep::Synced);
        assert_eq!(
            report.pages,
            vec![PageSummary { id: PageId::from_str("b"), title: "Bravo".into(), mode: PageMode::Canvas, tags: vec![] }]
        );
    }

    #[test]
    fn unknown_page_is_an_error() {
        let dir = tempdir().unwrap();
        let s = Session::open(dir.path().to_path_buf()).unwrap();
        assert!(s.record("ghost").is_err());
        assert!(s.remove_page("ghost").is_err());
        assert!(s.toggle_mode("ghost").is_err());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let dir = tempdir().unwrap();
        let s = Session::open(dir.path().to_path_buf()).unwrap();
        s.add_page("a", "A", vec![]).unwrap();
        let err = s.add_page("a", "again", vec![]).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
