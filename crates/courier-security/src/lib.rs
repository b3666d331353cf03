mod error;
mod events;
mod popup;
mod session;
mod store;
mod watcher;

pub use error::{AuthError, StoreError};
pub use events::{auth_channel, AuthEvent, AuthEventStream, MessageSubscription, StorageSubscription};
pub use popup::{PopupFeatures, PopupWindow, WindowFrame, WindowHost, POPUP_NAME};
pub use session::{AuthSessionSync, AuthSettings, AuthSnapshot};
pub use store::{KeychainStore, MemoryStore, SessionStore};
pub use watcher::StoreWatcher;
