pub mod classify;
pub mod config;
pub mod content;
pub mod credentials;
pub mod deletion;
pub mod error;
pub mod orchestrator;
pub mod paginator;
pub mod selection;
pub mod session;
pub mod twitter_client;
