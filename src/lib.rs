//! Realtime Bookmarks: a per-user bookmark list kept in sync with a hosted
//! record store and its row-level change feed.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
