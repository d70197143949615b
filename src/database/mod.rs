//! SQLite layer backing the local record store.
//!
//! Provides connection management and schema migrations for the
//! `bookmarks` table that stands in for the hosted service's table.
//!
//! # Usage
//!
//! ```no_run
//! use realtime_bookmarks::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("bookmarks.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
