//! Live push channels for connected citizens.

pub mod registry;
pub mod router;

pub use registry::{ChannelId, ConnectionRegistry, PushChannel};
pub use router::realtime_router;
