pub mod client_key;
pub mod error;
pub mod session;
