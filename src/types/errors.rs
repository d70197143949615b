use thiserror::Error;

// === ValidationError ===

/// Form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Url,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Url => "url",
        }
    }
}

/// Rejection of an add-command before it reaches the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The named field is empty or whitespace-only.
    #[error("All fields are required")]
    Required(Field),
    /// The title contains characters other than letters and whitespace.
    #[error("Title must contain only letters and spaces")]
    InvalidTitle,
    /// The URL is not shaped like `http(s)://[www.]domain.tld[/path]`.
    #[error("Enter valid URL (such as https://example.com)")]
    InvalidUrl,
}

impl ValidationError {
    /// The form field this error should be shown next to.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Required(field) => *field,
            ValidationError::InvalidTitle => Field::Title,
            ValidationError::InvalidUrl => Field::Url,
        }
    }
}

// === StoreError ===

/// Errors raised by a record store request.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("Record store transport error: {0}")]
    Transport(String),
    /// The store answered with a non-success status.
    #[error("Record store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The local SQLite store failed.
    #[error("Record store database error: {0}")]
    Database(String),
    /// The response body could not be decoded into records.
    #[error("Record store returned an unreadable response: {0}")]
    Decode(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

// === SubscriptionError ===

/// Errors opening a change subscription. Never fatal to the view.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The configured backend has no push channel.
    #[error("Change feed unavailable: {0}")]
    Unsupported(String),
    /// The feed refused the subscription.
    #[error("Subscription failed: {0}")]
    Failed(String),
}

// === SessionError ===

/// Errors reported by the session provider.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity supplied on sign-in has no usable id.
    #[error("Invalid user identity: {0}")]
    InvalidUser(String),
}

// === BookmarkError ===

/// Errors surfaced to the presentation layer by bookmark commands.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No user is signed in, so there is no view to act on.
    #[error("Please sign in to manage your bookmarks")]
    NotSignedIn,
    /// The id is not in the current collection.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// `load_all` failed; the previous list is still displayed.
    #[error("Could not load bookmarks: {0}")]
    LoadFailed(#[source] StoreError),
    #[error("Could not save bookmark: {0}")]
    InsertFailed(#[source] StoreError),
    /// The store refused a delete; the bookmark has been restored.
    #[error("Could not delete bookmark: {0}")]
    DeleteFailed(#[source] StoreError),
}

impl BookmarkError {
    /// The form field to attach this error to, for validation failures.
    pub fn field(&self) -> Option<Field> {
        match self {
            BookmarkError::Validation(e) => Some(e.field()),
            _ => None,
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("Settings I/O error: {0}")]
    Io(String),
    /// The settings file is not valid settings JSON.
    #[error("Invalid settings file: {0}")]
    Parse(String),
}

// === AppError ===

/// Errors building the application shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The local store has a fixed schema and cannot serve another table.
    #[error("The SQLite store only serves the 'bookmarks' table, not '{0}'")]
    UnsupportedTable(String),
    /// The configured backend was compiled out.
    #[error("Store backend not available in this build: {0}")]
    BackendUnavailable(String),
}
