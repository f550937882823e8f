use serde::{Deserialize, Serialize};

use crate::ids::*;

/// One entry of the workspace page-metadata collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub id: PageId,
    pub title: String,
    pub created_at_unix: i64,
    #[serde(default)]
    pub updated_at_unix: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PageMeta {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at_unix: i64) -> Self {
        Self {
            id: PageId::from_str(id),
            title: title.into(),
            created_at_unix,
            updated_at_unix: None,
            tags: vec![],
        }
    }

    /// Apply a patch in place. Returns true when anything changed.
    pub fn apply(&mut self, patch: &PageMetaPatch, now_unix: i64) -> bool {
        let mut changed = false;
        if let Some(title) = &patch.title {
            if *title != self.title {
                self.title = title.clone();
                changed = true;
            }
        }
        if let Some(tags) = &patch.tags {
            if *tags != self.tags {
                self.tags = tags.clone();
                changed = true;
            }
        }
        if changed {
            self.updated_at_unix = Some(now_unix);
        }
        changed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageMetaPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PageMetaPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), tags: None }
    }
}

/// Handle to a page document. `loaded` flips once the workspace has materialized it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_sets_updated_at_only_on_change() {
        let mut meta = PageMeta::new("p1", "Title", 10);
        assert!(!meta.apply(&PageMetaPatch::title("Title"), 20));
        assert_eq!(meta.updated_at_unix, None);

        assert!(meta.apply(&PageMetaPatch::title("Renamed"), 30));
        assert_eq!(meta.title, "Renamed");
        assert_eq!(meta.updated_at_unix, Some(30));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut meta = PageMeta::new("p1", "Title", 10);
        assert!(!meta.apply(&PageMetaPatch::default(), 20));
        assert_eq!(meta, PageMeta::new("p1", "Title", 10));
    }
}
