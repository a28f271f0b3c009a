use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authenticated — run `alm auth set-token` or configure a refresh token")]
    NotAuthenticated,

    #[error("token expired")]
    TokenExpired,

    #[error("keyring error: {0}")]
    KeyringError(String),

    #[error("token store error: {0}")]
    TokenStoreError(String),

    #[error("token exchange failed ({source_name}): {message}")]
    ExchangeFailed {
        source_name: &'static str,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}
