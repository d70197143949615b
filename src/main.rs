//! Realtime Bookmarks console demo.
//!
//! Runs one signed-in session against an in-memory SQLite record store and
//! walks through the reconciliation paths: optimistic adds, pushed changes
//! from another device, a refused delete and validation errors.

use std::error::Error;
use std::sync::Arc;

use realtime_bookmarks::app::App;
use realtime_bookmarks::services::record_store::RecordStore;
use realtime_bookmarks::services::session_provider::{LocalSessionProvider, SessionProvider};
use realtime_bookmarks::services::sqlite_store::SqliteRecordStore;
use realtime_bookmarks::types::bookmark::NewBookmark;
use realtime_bookmarks::types::session::User;
use realtime_bookmarks::types::settings::ClientSettings;

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_list(app: &App) {
    for b in app.bookmarks() {
        println!("    • {:<20} {}", b.title, b.url);
    }
    if app.bookmarks().is_empty() {
        println!("    (no bookmarks)");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            Realtime Bookmarks v{} - Demo Mode            ║", env!("CARGO_PKG_VERSION"));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let store = Arc::new(SqliteRecordStore::open_in_memory()?);
    let provider = Arc::new(LocalSessionProvider::default());
    let mut app = App::with_components(
        ClientSettings::default(),
        provider.clone(),
        store.clone(),
        store.clone(),
    );
    app.start().await?;

    section("Session");
    provider.sign_in(User::new("ada").with_full_name("Ada Lovelace"))?;
    app.sync_session().await?;
    println!("  {}", app.greeting());
    println!("  Live subscriptions: {}", store.subscriber_count());
    println!();

    section("Optimistic add");
    app.add_bookmark("Rust Docs", "https://docs.rs").await?;
    app.add_bookmark("Crates", "https://crates.io").await?;
    // Push echoes of both inserts arrive alongside the optimistic entries and are absorbed.
    let applied = app.pump();
    println!("  Added 2 bookmarks, echoes that changed the list: {}", applied);
    print_list(&app);
    println!();

    section("Change feed");
    store
        .insert(&NewBookmark {
            title: "Tokio".to_string(),
            url: "https://tokio.rs".to_string(),
            owner_id: "ada".to_string(),
        })
        .await?;
    store
        .insert(&NewBookmark {
            title: "Not Ada".to_string(),
            url: "https://example.com".to_string(),
            owner_id: "grace".to_string(),
        })
        .await?;
    app.pump();
    println!("  Another device added 'Tokio'; another user's insert stays out:");
    print_list(&app);
    println!();

    section("Delete rollback");
    let victim = app.bookmarks()[0].clone();
    store.fail_next_delete();
    match app.delete_bookmark(&victim.id).await {
        Ok(()) => println!("  Unexpected: delete succeeded"),
        Err(e) => println!("  {}", e),
    }
    println!("  '{}' restored in place:", victim.title);
    print_list(&app);
    app.delete_bookmark(&victim.id).await?;
    println!("  Retried, now {} bookmark(s)", app.bookmarks().len());
    println!();

    section("Validation");
    for (title, url) in [("My Site 3", "https://example.com"), ("Docs", "ftp://example.com"), ("", "")] {
        if let Err(e) = app.add_bookmark(title, url).await {
            let field = e.field().map_or("-", |f| f.as_str());
            println!("  [{}] {}", field, e);
        }
    }
    println!();

    section("Sign out");
    provider.sign_out()?;
    app.sync_session().await?;
    println!("  {}", app.greeting());
    println!("  Visible bookmarks: {}, live subscriptions: {}", app.bookmarks().len(), store.subscriber_count());
    app.shutdown();

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Demo finished");
    println!("═══════════════════════════════════════════════════════════════");
    Ok(())
}
