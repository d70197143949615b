// Realtime Bookmarks state managers
// Managers own the mounted view's state: the reconciled bookmark list and its change subscription.

pub mod bookmark_manager;
pub mod reconciler;
pub mod subscription_manager;
