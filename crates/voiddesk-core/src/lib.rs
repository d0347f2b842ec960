//! Download interception core for the VoidDesk desktop shell.
//!
//! Untrusted content surfaces (the embedded chat page) never touch the file
//! system themselves. Every navigation is classified here first, and every
//! outbound transfer is resolved to a confined path, tracked, and recorded by
//! the [`coordinator::Coordinator`].

pub mod classify;
pub mod config;
pub mod confine;
pub mod coordinator;
pub mod events;
pub mod fallback;
pub mod history;
pub mod host;
pub mod logging;
pub mod naming;
pub mod prefs;
pub mod resolver;
pub mod store;
pub mod transfer;
