pub mod memory;

use crate::item::ItemCollection;
use async_trait::async_trait;

/// The persistence collaborator contract (spec §6.1). The kernel never
/// implements this itself — persistence is explicitly out of scope (spec
/// §1 Non-goals) — it only depends on the trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, doc: ItemCollection) -> anyhow::Result<ItemCollection>;
    async fn load(&self, id: &str) -> anyhow::Result<Option<ItemCollection>>;
    /// `query` is an opaque search-DSL string the store alone interprets.
    async fn find(&self, query: &str, page_size: usize, page_index: usize, sort_by: Option<&str>, reverse: bool) -> anyhow::Result<Vec<ItemCollection>>;
    async fn get_documents_by_type(&self, doc_type: &str) -> anyhow::Result<Vec<ItemCollection>>;
}

pub use memory::MemoryDocumentStore;
