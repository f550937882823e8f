use std::sync::Arc;

use tracing::warn;
use wsp_core::{Page, PageId};
use wsp_live::{DisposableGroup, Emitter, LiveData};
use wsp_workspace::Workspace;

/// Follows a single page by id: present after it is added, `None` after it is removed.
/// A page that shows up unloaded is loaded before it is published.
pub fn watch_page(workspace: Arc<dyn Workspace>, id: Option<PageId>) -> LiveData<Option<Page>> {
    let Some(id) = id else {
        return LiveData::new(None);
    };
    let seed = workspace.page(&id);

    LiveData::from_source(seed, move |emitter: Emitter<Option<Page>>| {
        publish(&workspace, &emitter, &id);

        let group = DisposableGroup::new();
        {
            let (ws, emitter, target) = (workspace.clone(), emitter.clone(), id.clone());
            group.add(workspace.on_page_added(Box::new(move |added: &PageId| {
                if *added == target {
                    publish(&ws, &emitter, &target);
                }
            })));
        }
        {
            let target = id.clone();
            group.add(workspace.on_page_removed(Box::new(move |removed: &PageId| {
                if *removed == target {
                    emitter.emit(None);
                }
            })));
        }
        group.into_disposer()
    })
    .labeled("watch_page")
}

fn publish(workspace: &Arc<dyn Workspace>, emitter: &Emitter<Option<Page>>, id: &PageId) {
    let page = match workspace.page(id) {
        Some(page) if !page.loaded => match workspace.load_page(id) {
            Ok(()) => workspace.page(id).or(Some(page)),
            Err(err) => {
                warn!(page = %id, error = %err, "page load failed");
                Some(page)
            }
        },
        other => other,
    };
    emitter.emit(page);
}
