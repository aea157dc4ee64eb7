//! Vote ingestion and live synchronization.

pub mod error;
pub mod expiry;
pub mod gate;
pub mod hub;

pub use error::VoteError;
pub use gate::VoteGate;
pub use hub::{BroadcastHub, Connection};
