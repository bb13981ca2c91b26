//! Teacher transfer matching and notification core for the GovEase backend.
//!
//! The crate pairs reciprocal district-transfer requests, drives the
//! two-party agreement state machine over the resulting match, and fans out
//! each state change to the affected citizens through a deduplicated,
//! at-least-once notification channel (persisted record, best-effort live
//! push, best-effort email hand-off). The HTTP routers for each sub-domain
//! live next to the services they expose and are composed by the api
//! service.

pub mod config;
pub mod directory;
pub mod error;
pub mod notifications;
pub mod realtime;
pub mod sequence;
pub mod store;
pub mod telemetry;
pub mod transfers;
