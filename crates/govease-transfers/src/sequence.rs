use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::StoreError;

/// Entity namespaces with independent counters. Each maps to the 3-letter
/// prefix carried by persisted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceNamespace {
    TransferRequest,
    TransferMatch,
    Notification,
    Application,
    Admin,
    Citizen,
    Teacher,
}

impl SequenceNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceNamespace::TransferRequest => "REQ",
            SequenceNamespace::TransferMatch => "TM",
            SequenceNamespace::Notification => "NOT",
            SequenceNamespace::Application => "APP",
            SequenceNamespace::Admin => "ADM",
            SequenceNamespace::Citizen => "CIT",
            SequenceNamespace::Teacher => "TEA",
        }
    }

    /// Formats a sequence number into the persisted identifier shape,
    /// e.g. `7` in the request namespace becomes `REQ00007`.
    pub fn format(&self, n: u64) -> String {
        format!("{}{:05}", self.prefix(), n)
    }
}

/// Allocates monotonically increasing numbers per namespace.
///
/// Every call must yield a distinct number even under overlapping
/// concurrent invocations; gaps are permitted when a subsequent insert
/// using the number fails. Allocator unavailability is fatal to the
/// calling create operation.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    async fn next(&self, namespace: SequenceNamespace) -> Result<u64, StoreError>;
}

/// Process-local allocator backed by a mutex-guarded counter table.
#[derive(Default)]
pub struct InMemorySequences {
    counters: Mutex<HashMap<SequenceNamespace, u64>>,
}

#[async_trait]
impl SequenceAllocator for InMemorySequences {
    async fn next(&self, namespace: SequenceNamespace) -> Result<u64, StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| StoreError::Unavailable("sequence counters poisoned".to_string()))?;
        let counter = counters.entry(namespace).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
