// Realtime Bookmarks services
// Services sit at the system boundary: record stores, the session provider, validation and settings.

pub mod record_store;
#[cfg(feature = "rest")]
pub mod rest_store;
pub mod session_provider;
pub mod settings_file;
pub mod sqlite_store;
pub mod validation;
