/// Error enumeration shared by the persistence seams.
///
/// `Conflict` is raised by inserts that would violate a uniqueness
/// constraint (duplicate identifier or `pair_key`); the match engine
/// converts it into a re-fetch rather than surfacing it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
