use anyhow::Result;
use std::sync::Arc;

use wsp_core::{now_unix, PageId, PageMeta, PageMetaPatch, SyncEngineStep};
use wsp_live::DisposableGroup;
use wsp_workspace::Workspace;

use crate::Session;

/// One scripted mutation for `wsp watch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DemoStep {
    AddPage { id: String, title: String },
    RenamePage { id: String, title: String },
    RemovePage { id: String },
    SetStep(SyncEngineStep),
}

pub fn default_demo() -> Vec<DemoStep> {
    vec![
        DemoStep::SetStep(SyncEngineStep::Syncing),
        DemoStep::AddPage { id: "demo-1".into(), title: "First demo page".into() },
        DemoStep::AddPage { id: "demo-2".into(), title: "Second demo page".into() },
        DemoStep::RenamePage { id: "demo-1".into(), title: "Renamed demo page".into() },
        DemoStep::SetStep(SyncEngineStep::Synced),
        DemoStep::RemovePage { id: "demo-1".into() },
        DemoStep::RemovePage { id: "demo-2".into() },
    ]
}

/// Subscribes to the session's live values, applies `steps` to the in-memory workspace
/// (nothing is saved) and reports every emission through `sink`.
pub fn run_demo(session: &Session, steps: &[DemoStep], sink: impl Fn(String) + Send + Sync + 'static) -> Result<()> {
    let sink = Arc::new(sink);
    let subscriptions = DisposableGroup::new();
    {
        let sink = sink.clone();
        subscriptions.add(session.pages.records().subscribe(move |records| {
            let ids: Vec<&str> = records.iter().map(|r| r.id().as_str()).collect();
            sink(format!("records: [{}]", ids.join(", ")));
        }));
    }
    {
        let sink = sink.clone();
        subscriptions.add(session.pages.is_ready().subscribe(move |ready| sink(format!("ready: {ready}"))));
    }

    let ws = &session.workspace;
    for step in steps {
        sink(format!("> {}", describe(step)));
        match step {
            DemoStep::AddPage { id, title } => {
                ws.add_page(PageMeta::new(id.as_str(), title.as_str(), now_unix()))?;
            }
            DemoStep::RenamePage { id, title } => {
                ws.update_page_meta(&PageId::from_str(id.as_str()), PageMetaPatch::title(title.as_str()))?;
            }
            DemoStep::RemovePage { id } => {
                ws.remove_page(&PageId::from_str(id.as_str()))?;
            }
            DemoStep::SetStep(step) => ws.set_sync_step(*step),
        }
    }
    subscriptions.dispose();
    Ok(())
}

fn describe(step: &DemoStep) -> String {
    match step {
        DemoStep::AddPage { id, .. } => format!("add {id}"),
        DemoStep::RenamePage { id, title } => format!("rename {id} -> {title}"),
        DemoStep::RemovePage { id } => format!("remove {id}"),
        DemoStep::SetStep(step) => format!("sync {}", step.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[test]
    fn demo_reports_every_emission_in_order() {
        let dir = tempdir().unwrap();
        let session = Session::open(dir.path().to_path_buf()).unwrap();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let l = lines.clone();
        run_demo(&session, &default_demo(), move |line| l.lock().unwrap().push(line)).unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "records: []",
                "ready: false",
                "> sync syncing",
                "ready: false",
                "> add demo-1",
                "records: [demo-1]",
                "> add demo-2",
                "records: [demo-1, demo-2]",
                "> rename demo-1 -> Renamed demo page",
                "records: [demo-1, demo-2]",
                "> sync synced",
                "ready: true",
                "> remove demo-1",
                "records: [demo-2]",
                "> remove demo-2",
                "records: []",
            ]
        );
        assert_eq!(session.workspace.metas_listener_count(), 0);
        assert_eq!(session.workspace.status_listener_count(), 0);
    }

    #[test]
    fn demo_does_not_touch_the_metadata_file() {
        let dir = tempdir().unwrap();
        Session::init_repo(dir.path()).unwrap();
        let session = Session::open(dir.path().to_path_buf()).unwrap();
        run_demo(&session, &default_demo()[..2], |_| {}).unwrap();
        let reopened = Session::open(dir.path().to_path_buf()).unwrap();
        assert!(reopened.status().pages.is_empty());
    }
}
