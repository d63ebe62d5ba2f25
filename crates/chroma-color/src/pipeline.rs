//! The composed, ordered colour transform for one transform key.

use crate::operation::{OpOrigin, OperationData};
use std::cmp::Ordering;
use std::sync::Arc;

/// Ordered operations plus a combined id derived from their cache ids.
///
/// Cheap to clone; the operations are shared with the result cache and with
/// every caller that resolved the same key.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    operations: Vec<Arc<OperationData>>,
    cache_id: String,
}

fn by_order(a: &Arc<OperationData>, b: &Arc<OperationData>) -> Ordering {
    a.order_index
        .total_cmp(&b.order_index)
        .then_with(|| a.cache_id.cmp(&b.cache_id))
}

/// Hash the concatenation of `ids`, in the order given.
pub fn combine_cache_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

impl PipelineResult {
    /// Sort `operations` by ordering index and derive the combined id.
    ///
    /// The result only depends on the multiset of operations, never on the
    /// order they were handed in. Equal ordering indices fall back to the
    /// cache id.
    pub fn compose(mut operations: Vec<Arc<OperationData>>) -> Self {
        operations.sort_by(by_order);
        let cache_id = combine_cache_ids(operations.iter().map(|op| op.cache_id.as_str()));
        Self {
            operations,
            cache_id,
        }
    }

    pub fn operations(&self) -> &[Arc<OperationData>] {
        &self.operations
    }

    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Cache ids of the operations in pipeline order.
    pub fn constituent_cache_ids(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.cache_id.clone()).collect()
    }

    /// First operation produced by `origin`.
    pub fn operation(&self, origin: OpOrigin) -> Option<&Arc<OperationData>> {
        self.operations.iter().find(|op| op.origin == origin)
    }

    /// New result with the operation of the same origin swapped for `op`
    /// (or `op` added if no such operation exists).
    pub fn replace_operation(&self, op: Arc<OperationData>) -> Self {
        let mut operations: Vec<_> = self
            .operations
            .iter()
            .filter(|existing| existing.origin != op.origin)
            .cloned()
            .collect();
        operations.push(op);
        Self::compose(operations)
    }

    /// Total LUT bytes across all operations.
    pub fn size(&self) -> usize {
        self.operations.iter().map(|op| op.size()).sum()
    }
}
