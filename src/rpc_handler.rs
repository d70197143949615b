//! RPC method handler for the Realtime Bookmarks JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! session provider and the mounted bookmark view via the `App` struct.

use serde_json::{json, Value};
use tracing::warn;

use crate::app::App;
use crate::types::bookmark::Bookmark;
use crate::types::errors::{BookmarkError, SessionError};
use crate::types::session::User;

/// Error payload of a failed RPC call.
///
/// `field` names the form input a validation error belongs to, so the
/// presentation layer can show the message next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub message: String,
    pub field: Option<&'static str>,
}

impl RpcError {
    pub fn to_json(&self, id: Value) -> Value {
        match self.field {
            Some(field) => json!({"id": id, "error": self.message, "field": field}),
            None => json!({"id": id, "error": self.message}),
        }
    }
}

impl From<String> for RpcError {
    fn from(message: String) -> Self {
        Self { message, field: None }
    }
}

impl From<&str> for RpcError {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

impl From<BookmarkError> for RpcError {
    fn from(err: BookmarkError) -> Self {
        Self {
            field: err.field().map(|f| f.as_str()),
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for RpcError {
    fn from(err: SessionError) -> Self {
        err.to_string().into()
    }
}

fn items(bookmarks: &[Bookmark]) -> Value {
    json!({ "items": bookmarks })
}

fn session_json(app: &App) -> Value {
    json!({ "user": app.current_user(), "greeting": app.greeting() })
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Pending sign-in/sign-out transitions and queued push events are applied
/// before the method runs, so every response reflects the latest state.
pub async fn handle_method(app: &mut App, method: &str, params: &Value) -> Result<Value, RpcError> {
    if let Err(e) = app.sync_session().await {
        warn!(error = %e, "Session transition left the view without data");
    }
    app.pump();

    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Session ───
        "session.sign_in" => {
            let id = params.get("id").and_then(|v| v.as_str()).ok_or("missing id")?;
            let mut user = User::new(id);
            user.full_name = params.get("full_name").and_then(|v| v.as_str()).map(String::from);
            user.name = params.get("name").and_then(|v| v.as_str()).map(String::from);
            user.access_token = params.get("access_token").and_then(|v| v.as_str()).map(String::from);
            app.session_provider().sign_in(user)?;
            app.sync_session().await?;
            Ok(session_json(app))
        }
        "session.sign_out" => {
            app.session_provider().sign_out()?;
            app.sync_session().await?;
            Ok(json!({"ok": true}))
        }
        "session.user" => Ok(session_json(app)),

        // ─── Bookmarks ───
        "bookmark.add" => {
            // Absent fields go through validation so the error names the field.
            let title = params.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = params.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let record = app.add_bookmark(title, url).await?;
            Ok(json!(record))
        }
        "bookmark.delete" => {
            let id = params.get("id").and_then(|v| v.as_str()).ok_or("missing id")?;
            app.delete_bookmark(id).await?;
            Ok(json!({"ok": true}))
        }
        "bookmark.list" => {
            if app.current_user().is_none() {
                return Err(BookmarkError::NotSignedIn.into());
            }
            Ok(items(app.bookmarks()))
        }

        // ─── View lifecycle ───
        "view.visibility" => {
            let visible = params
                .get("visible")
                .and_then(|v| v.as_bool())
                .ok_or("missing visible")?;
            app.on_visibility_change(visible).await?;
            Ok(items(app.bookmarks()))
        }
        "view.refresh" => {
            let bookmarks = app.refresh().await?;
            Ok(items(bookmarks))
        }

        _ => Err(format!("unknown method: {}", method).into()),
    }
}
