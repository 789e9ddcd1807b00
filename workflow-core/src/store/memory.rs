use super::DocumentStore;
use crate::item::{ItemCollection, Value, ITEM_MODIFIED, ITEM_UNIQUEID};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process `DocumentStore` for tests and the admin demo (spec §6.1),
/// analogous to the teacher's `MemoryStore`. Not a production persistence
/// engine — none is specified (spec §1 Non-goals).
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<String, ItemCollection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn save(&self, mut doc: ItemCollection) -> anyhow::Result<ItemCollection> {
        let id = if doc.get_item_value_string(ITEM_UNIQUEID).is_empty() {
            let id = Uuid::now_v7().to_string();
            doc.set_item_value(ITEM_UNIQUEID, Value::Str(id.clone()));
            id
        } else {
            doc.get_item_value_string(ITEM_UNIQUEID)
        };
        doc.set_item_value(ITEM_MODIFIED, Value::Instant(Utc::now()));
        self.docs.write().await.insert(id, doc.clone());
        Ok(doc)
    }

    async fn load(&self, id: &str) -> anyhow::Result<Option<ItemCollection>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    /// Best-effort opaque query support: `query` is either empty (match
    /// all) or `field=value`, matched against the document's string
    /// representation of `field`. Not a full search DSL — none is
    /// specified (spec §6.1 only requires the contract shape).
    async fn find(&self, query: &str, page_size: usize, page_index: usize, sort_by: Option<&str>, reverse: bool) -> anyhow::Result<Vec<ItemCollection>> {
        let docs = self.docs.read().await;
        let mut matched: Vec<ItemCollection> = docs
            .values()
            .filter(|d| match query.split_once('=') {
                Some((field, value)) => d.get_item_value_string(field.trim()) == value.trim(),
                None => query.trim().is_empty(),
            })
            .cloned()
            .collect();

        if let Some(field) = sort_by {
            matched.sort_by_key(|d| d.get_item_value_string(field));
            if reverse {
                matched.reverse();
            }
        }

        let start = page_index.saturating_mul(page_size);
        Ok(matched.into_iter().skip(start).take(page_size.max(1)).collect())
    }

    async fn get_documents_by_type(&self, doc_type: &str) -> anyhow::Result<Vec<ItemCollection>> {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|d| d.get_item_value_string("type") == doc_type).cloned().collect())
    }
}
