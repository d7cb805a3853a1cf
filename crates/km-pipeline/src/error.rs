//! Errors a pipeline run can raise directly.
//!
//! Per-message extraction failures are not modeled here: spec.md §7 routes
//! those through `IndexingEventHandlers::on_knowledge_extracted` and
//! records them on the run's `IndexingResults`, rather than aborting the
//! run. What lands here is everything that leaves the indexes
//! potentially inconsistent if swallowed: storage I/O failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexingError {
    #[error(transparent)]
    Storage(#[from] km_storage::StorageError),
}
