use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("keychain error: {0}")]
    Keychain(#[from] keyring::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Pop-ups blocked. Allow pop-ups for Courier and try again.")]
    PopupBlocked,
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] courier_config::ConfigError),
}
