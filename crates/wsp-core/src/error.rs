use thiserror::Error;

use crate::ids::PageId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("page already exists: {0}")]
    DuplicatePage(PageId),
    #[error("page not found: {0}")]
    PageNotFound(PageId),
}
