pub mod chain;

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::finding::Finding;

/// Bounded buffer of the most recent findings, shared with the API.
#[derive(Clone, Default)]
pub struct FindingsBuffer {
    inner: Arc<RwLock<VecDeque<Finding>>>,
}

const MAX_BUFFERED_FINDINGS: usize = 256;

impl FindingsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, finding: Finding) {
        let mut buffer = self.inner.write().await;
        if buffer.len() == MAX_BUFFERED_FINDINGS {
            buffer.pop_back();
        }
        buffer.push_front(finding);
    }

    /// Newest first.
    pub async fn snapshot(&self) -> Vec<Finding> {
        self.inner.read().await.iter().cloned().collect()
    }
}
