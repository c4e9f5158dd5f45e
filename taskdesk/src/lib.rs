//! `Taskdesk` — chat-embedded task board client library.

pub mod board;
pub mod config;
pub mod mutation;
pub mod notify;
pub mod project;
pub mod reconcile;
pub mod scope;
pub mod session;
pub mod store;
