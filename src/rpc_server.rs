//! Realtime Bookmarks RPC Server: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"title":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"...", "field":"title"}

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use realtime_bookmarks::app::App;
use realtime_bookmarks::logging;
use realtime_bookmarks::rpc_handler::handle_method;
use realtime_bookmarks::services::session_provider::LocalSessionProvider;
use realtime_bookmarks::services::settings_file::{self, SettingsFile, DATA_DIR_ENV};
use realtime_bookmarks::types::settings::ClientSettings;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(value: &Value) {
    let mut out = io::stdout().lock();
    // A closed stdout means the UI shell is gone; the read loop ends on EOF.
    let _ = writeln!(out, "{}", value);
    let _ = out.flush();
}

/// Runs before logging is up, so problems go straight to stderr.
fn load_settings() -> ClientSettings {
    let mut settings = SettingsFile::in_config_dir()
        .load_or_create()
        .unwrap_or_else(|e| {
            eprintln!("realtime-bookmarks: {}, using defaults", e);
            ClientSettings::default()
        });

    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        settings_file::pin_data_dir(&mut settings, std::path::Path::new(&dir));
    }
    settings
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let settings = load_settings();
    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("realtime-bookmarks: logging already initialized: {}", e);
    }

    let provider = Arc::new(LocalSessionProvider::default());
    let mut app = match App::new(settings, provider) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to initialize");
            emit(&json!({"event": "error", "error": e.to_string()}));
            std::process::exit(1);
        }
    };
    if let Err(e) = app.start().await {
        warn!(error = %e, "Initial load failed");
    }

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    info!("RPC bridge ready");

    let mut rate_limiter = RateLimiter::new(200);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&mut app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => err.to_json(id),
        };
        emit(&response);
    }

    app.shutdown();
    info!("RPC bridge stopped");
}
