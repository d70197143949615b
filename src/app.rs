//! App Core for Realtime Bookmarks.
//!
//! The application shell a presentation layer drives: it follows the session
//! provider, mounts one bookmark view per signed-in user and forwards
//! commands to it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::platform;
use crate::services::record_store::{ChangeFeed, RecordStore};
use crate::services::session_provider::SessionProvider;
use crate::services::sqlite_store::{self, SqliteRecordStore};
use crate::types::bookmark::Bookmark;
use crate::types::errors::{AppError, BookmarkError, StoreError};
use crate::types::session::{SessionContext, User, DEFAULT_DISPLAY_NAME};
use crate::types::settings::{ClientSettings, StoreBackend, StoreSettings};

/// Builds the record store and change feed selected by `settings`.
pub fn open_store(
    settings: &StoreSettings,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn ChangeFeed>), AppError> {
    match settings.backend {
        StoreBackend::Sqlite => {
            if settings.table != sqlite_store::TABLE_NAME {
                return Err(AppError::UnsupportedTable(settings.table.clone()));
            }
            let path = match &settings.database_path {
                Some(p) => std::path::PathBuf::from(p),
                None => platform::get_data_dir().join("bookmarks.db"),
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(format!("Failed to create data directory: {}", e))
                })?;
            }
            let store = Arc::new(SqliteRecordStore::open(&path)?);
            info!(path = %path.display(), "Using local SQLite record store");
            let records: Arc<dyn RecordStore> = store.clone();
            let feed: Arc<dyn ChangeFeed> = store;
            Ok((records, feed))
        }
        #[cfg(feature = "rest")]
        StoreBackend::Rest => {
            use crate::services::record_store::DetachedFeed;
            use crate::services::rest_store::RestRecordStore;

            info!(base_url = %settings.base_url, "Using REST record store");
            let records: Arc<dyn RecordStore> = Arc::new(RestRecordStore::from_settings(settings));
            let feed: Arc<dyn ChangeFeed> = Arc::new(DetachedFeed);
            Ok((records, feed))
        }
        #[cfg(not(feature = "rest"))]
        StoreBackend::Rest => Err(AppError::BackendUnavailable("rest".to_string())),
    }
}

/// Central application struct: session tracking plus the mounted bookmark view.
pub struct App {
    settings: ClientSettings,
    session_provider: Arc<dyn SessionProvider>,
    auth_rx: watch::Receiver<Option<User>>,
    store: Arc<dyn RecordStore>,
    feed: Arc<dyn ChangeFeed>,
    view: Option<BookmarkManager>,
}

impl App {
    /// Creates an App with the store configured in `settings`.
    pub fn new(
        settings: ClientSettings,
        session_provider: Arc<dyn SessionProvider>,
    ) -> Result<Self, AppError> {
        let (store, feed) = open_store(&settings.store)?;
        Ok(Self::with_components(settings, session_provider, store, feed))
    }

    /// Creates an App from already-built collaborators.
    pub fn with_components(
        settings: ClientSettings,
        session_provider: Arc<dyn SessionProvider>,
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        let auth_rx = session_provider.subscribe();
        Self {
            settings,
            session_provider,
            auth_rx,
            store,
            feed,
            view: None,
        }
    }

    /// Mounts a view for whoever is signed in right now.
    pub async fn start(&mut self) -> Result<(), BookmarkError> {
        let user = self.auth_rx.borrow_and_update().clone();
        self.switch_user(user).await.map(|_| ())
    }

    /// Applies a pending sign-in/sign-out transition, if any.
    ///
    /// Returns `Ok(true)` when the mounted view changed.
    pub async fn sync_session(&mut self) -> Result<bool, BookmarkError> {
        if !matches!(self.auth_rx.has_changed(), Ok(true)) {
            return Ok(false);
        }
        let user = self.auth_rx.borrow_and_update().clone();
        self.switch_user(user).await
    }

    async fn switch_user(&mut self, user: Option<User>) -> Result<bool, BookmarkError> {
        let mounted = self.view.as_ref().map(|v| v.session().owner_id());
        if mounted == user.as_ref().map(|u| u.id.as_str()) {
            // Same user, possibly with a renewed token.
            if let Some(user) = &user {
                self.store.authorize(user.access_token.as_deref());
            }
            return Ok(false);
        }

        // The old subscription must be gone before a new one can open.
        self.unmount();

        let Some(user) = user else {
            return Ok(true);
        };
        let mut view = BookmarkManager::new(
            SessionContext::new(user),
            self.store.clone(),
            self.feed.clone(),
            &self.settings.store.table,
        );
        let mounted = view.mount().await;
        self.view = Some(view);
        mounted.map(|_| true)
    }

    /// Refetches the list when the view comes back to the foreground.
    pub async fn on_visibility_change(&mut self, visible: bool) -> Result<(), BookmarkError> {
        if !visible || !self.settings.session.refresh_on_visibility {
            return Ok(());
        }
        if let Some(view) = self.view.as_mut() {
            info!("View visible again, refetching bookmarks");
            view.load_all().await?;
        }
        Ok(())
    }

    /// Explicit full reload of the mounted view.
    pub async fn refresh(&mut self) -> Result<&[Bookmark], BookmarkError> {
        self.view_mut()?.load_all().await
    }

    pub async fn add_bookmark(&mut self, title: &str, url: &str) -> Result<Bookmark, BookmarkError> {
        self.view_mut()?.add_bookmark(title, url).await
    }

    pub async fn delete_bookmark(&mut self, id: &str) -> Result<(), BookmarkError> {
        self.view_mut()?.delete_bookmark(id).await
    }

    /// Drains queued push events into the mounted view.
    pub fn pump(&mut self) -> usize {
        self.view.as_mut().map_or(0, |v| v.pump())
    }

    /// The current list; empty when nobody is signed in.
    pub fn bookmarks(&self) -> &[Bookmark] {
        self.view.as_ref().map(|v| v.bookmarks()).unwrap_or_default()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.view.as_ref().map(|v| v.session().user())
    }

    pub fn view(&self) -> Option<&BookmarkManager> {
        self.view.as_ref()
    }

    pub fn session_provider(&self) -> &Arc<dyn SessionProvider> {
        &self.session_provider
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Header line shown above the form.
    pub fn greeting(&self) -> String {
        let name = self
            .current_user()
            .map_or(DEFAULT_DISPLAY_NAME, |u| u.display_name());
        format!("{}, what do you want to bookmark today?", name)
    }

    fn view_mut(&mut self) -> Result<&mut BookmarkManager, BookmarkError> {
        self.view.as_mut().ok_or(BookmarkError::NotSignedIn)
    }

    fn unmount(&mut self) {
        if let Some(mut view) = self.view.take() {
            view.unmount();
        }
    }

    /// Tears down the mounted view and its subscription.
    pub fn shutdown(&mut self) {
        if self.view.is_some() {
            warn!("Shutting down with a mounted view");
        }
        self.unmount();
    }
}
