//! Node id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::domain::NodeId;

/// Source of fresh node ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Random UUID v4 ids.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> NodeId {
        NodeId::new(Uuid::new_v4().simple().to_string())
    }
}

/// Monotonic counter ids in a namespace, e.g. `team-1`, `team-2`.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeId::new(format!("{}-{}", self.prefix, n))
    }
}
