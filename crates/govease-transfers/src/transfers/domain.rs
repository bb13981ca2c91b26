use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a submitted transfer intent. Wire spellings are kept
/// compatible with existing persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(rename = "Waiting List")]
    WaitingList,
}

impl RequestStatus {
    /// Statuses still eligible to participate in reciprocal matching.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::WaitingList)
    }
}

/// A teacher's submitted intent to move from one district to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub request_id: String,
    pub teacher_id: String,
    pub from_district: String,
    pub to_district: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Bilateral agreement status, a pure function of the two agree flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PENDING-AGREED")]
    PendingAgreed,
    #[serde(rename = "AGREED")]
    Agreed,
}

impl MatchStatus {
    pub fn derive(agree_a: bool, agree_b: bool) -> Self {
        match (agree_a, agree_b) {
            (true, true) => MatchStatus::Agreed,
            (false, false) => MatchStatus::Pending,
            _ => MatchStatus::PendingAgreed,
        }
    }
}

/// Order-independent uniqueness key for a match: the two request ids sorted
/// lexicographically and joined with `|`. Guarantees at most one match per
/// unordered request pair regardless of call order.
pub fn pair_key(request_a_id: &str, request_b_id: &str) -> String {
    let (low, high) = if request_a_id <= request_b_id {
        (request_a_id, request_b_id)
    } else {
        (request_b_id, request_a_id)
    };
    format!("{low}|{high}")
}

/// Durable record pairing two reciprocal requests and tracking bilateral
/// agreement. `request_a_id`/`request_b_id` reflect creation order, not
/// semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMatch {
    pub matching_id: String,
    pub request_a_id: String,
    pub request_b_id: String,
    pub pair_key: String,
    pub agree_a: bool,
    pub agree_b: bool,
    pub match_status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferMatch {
    pub fn new(
        matching_id: String,
        request_a_id: String,
        request_b_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        let key = pair_key(&request_a_id, &request_b_id);
        Self {
            matching_id,
            request_a_id,
            request_b_id,
            pair_key: key,
            agree_a: false,
            agree_b: false,
            match_status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_side(&self, request_id: &str) -> bool {
        self.request_a_id == request_id || self.request_b_id == request_id
    }

    /// The request id of the side opposite to `request_id`, when it is a
    /// side of this match at all.
    pub fn other_side(&self, request_id: &str) -> Option<&str> {
        if self.request_a_id == request_id {
            Some(&self.request_b_id)
        } else if self.request_b_id == request_id {
            Some(&self.request_a_id)
        } else {
            None
        }
    }

    /// Applies an agreement transition, recomputing the status from the
    /// flags. Returns false without touching state when the acting request
    /// id is not a side of this match.
    pub fn apply(&mut self, update: &MatchUpdate, now: DateTime<Utc>) -> bool {
        match update {
            MatchUpdate::Agree { request_id } => {
                if self.request_a_id == *request_id {
                    self.agree_a = true;
                } else if self.request_b_id == *request_id {
                    self.agree_b = true;
                } else {
                    return false;
                }
            }
            MatchUpdate::Reset { request_id } => {
                if !self.is_side(request_id) {
                    return false;
                }
                self.agree_a = false;
                self.agree_b = false;
            }
        }
        self.match_status = MatchStatus::derive(self.agree_a, self.agree_b);
        self.updated_at = now;
        true
    }
}

/// Agreement transitions, applied atomically by the match store.
#[derive(Debug, Clone)]
pub enum MatchUpdate {
    /// Sets the acting side's agree flag; the other side is untouched.
    Agree { request_id: String },
    /// Full reset triggered by either party: both flags false, status
    /// PENDING, regardless of prior state.
    Reset { request_id: String },
}

/// Case- and whitespace-normalized subject set. Order and duplicates are
/// irrelevant to matching.
pub fn normalized_subjects(subjects: &[String]) -> BTreeSet<String> {
    subjects
        .iter()
        .map(|subject| subject.trim().to_lowercase())
        .filter(|subject| !subject.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_match() -> TransferMatch {
        TransferMatch::new(
            "TM00001".to_string(),
            "REQ00001".to_string(),
            "REQ00002".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("REQ00002", "REQ00001"), "REQ00001|REQ00002");
        assert_eq!(
            pair_key("REQ00001", "REQ00002"),
            pair_key("REQ00002", "REQ00001")
        );
    }

    #[test]
    fn status_is_a_pure_function_of_the_flags() {
        assert_eq!(MatchStatus::derive(false, false), MatchStatus::Pending);
        assert_eq!(MatchStatus::derive(true, false), MatchStatus::PendingAgreed);
        assert_eq!(MatchStatus::derive(false, true), MatchStatus::PendingAgreed);
        assert_eq!(MatchStatus::derive(true, true), MatchStatus::Agreed);
    }

    #[test]
    fn agree_from_each_side_reaches_agreed() {
        let mut m = fresh_match();
        assert!(m.apply(
            &MatchUpdate::Agree {
                request_id: "REQ00001".to_string()
            },
            Utc::now()
        ));
        assert_eq!(m.match_status, MatchStatus::PendingAgreed);
        assert!(m.apply(
            &MatchUpdate::Agree {
                request_id: "REQ00002".to_string()
            },
            Utc::now()
        ));
        assert_eq!(m.match_status, MatchStatus::Agreed);
        assert!(m.agree_a && m.agree_b);
    }

    #[test]
    fn repeated_agree_from_one_side_is_idempotent() {
        let mut m = fresh_match();
        let update = MatchUpdate::Agree {
            request_id: "REQ00001".to_string(),
        };
        assert!(m.apply(&update, Utc::now()));
        let snapshot = (m.agree_a, m.agree_b, m.match_status);
        assert!(m.apply(&update, Utc::now()));
        assert_eq!(snapshot, (m.agree_a, m.agree_b, m.match_status));
    }

    #[test]
    fn reset_clears_both_flags_from_any_state() {
        let mut m = fresh_match();
        m.agree_a = true;
        m.agree_b = true;
        m.match_status = MatchStatus::Agreed;
        assert!(m.apply(
            &MatchUpdate::Reset {
                request_id: "REQ00002".to_string()
            },
            Utc::now()
        ));
        assert!(!m.agree_a && !m.agree_b);
        assert_eq!(m.match_status, MatchStatus::Pending);
    }

    #[test]
    fn foreign_request_id_is_rejected_without_side_effects() {
        let mut m = fresh_match();
        assert!(!m.apply(
            &MatchUpdate::Agree {
                request_id: "REQ09999".to_string()
            },
            Utc::now()
        ));
        assert_eq!(m.match_status, MatchStatus::Pending);
        assert!(!m.apply(
            &MatchUpdate::Reset {
                request_id: "REQ09999".to_string()
            },
            Utc::now()
        ));
    }

    #[test]
    fn subject_sets_ignore_case_whitespace_and_duplicates() {
        let left = normalized_subjects(&[
            " Mathematics ".to_string(),
            "science".to_string(),
            "Science".to_string(),
        ]);
        let right = normalized_subjects(&["MATHEMATICS".to_string(), " Science".to_string()]);
        assert_eq!(left, right);
    }

    #[test]
    fn waiting_list_wire_spelling_is_preserved() {
        let json = serde_json::to_string(&RequestStatus::WaitingList).expect("serializes");
        assert_eq!(json, "\"Waiting List\"");
        let status = serde_json::to_string(&MatchStatus::PendingAgreed).expect("serializes");
        assert_eq!(status, "\"PENDING-AGREED\"");
    }
}
