//! Transfer request intake, reciprocal matching, and bilateral agreement.

pub mod domain;
pub mod matching;
pub mod router;
pub mod service;
pub mod store;

pub use domain::{
    normalized_subjects, pair_key, MatchStatus, MatchUpdate, RequestStatus, TransferMatch,
    TransferRequest,
};
pub use matching::MatchEngine;
pub use router::transfer_router;
pub use service::{
    MatchOutcome, NewTransferRequest, TransferError, TransferService, MIN_YEARS_IN_DISTRICT,
};
pub use store::{InMemoryMatchStore, InMemoryRequestStore, MatchStore, RequestStore};
