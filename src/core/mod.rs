pub mod config;
pub mod contacts;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod offline;
pub mod session;
pub mod transport;
