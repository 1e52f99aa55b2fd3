//! Document store interface used by the repos and the transition executor.
use async_trait::async_trait;

use crate::repos::document::{
    Document, Filter, FindOptions, Group, Pipeline, TransitionResult, Update,
};
use crate::repos::error::RepoResult;
use crate::services::record_id::RecordId;

/// Backend-agnostic document store.
///
/// Every method is a single store operation. `update_one` in particular must be
/// one atomic conditional write: implementations never read the document and
/// write it back in a separate step.
///
/// Implementations are shared behind `Arc<dyn DocumentStore>` for the whole
/// process and must not be closed by callers.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    // Returns the backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn find_one(&self, filter: &Filter) -> RepoResult<Option<Document>>;

    async fn find_many(&self, filter: &Filter, options: &FindOptions) -> RepoResult<Vec<Document>>;

    // Insert a new document under a freshly generated id and return that id.
    async fn insert_one(&self, collection: &'static str, doc: Document) -> RepoResult<RecordId>;

    // Apply one transition to the first document matching `filter`.
    //
    // Upserts (`update.on_insert` is Some) require an id-only filter.
    async fn update_one(&self, filter: &Filter, update: &Update) -> RepoResult<TransitionResult>;

    // Returns the number of deleted documents.
    async fn delete_many(&self, filter: &Filter) -> RepoResult<u64>;

    async fn aggregate(&self, pipeline: &Pipeline) -> RepoResult<Vec<Group>>;
}
