use ec_provider::ProviderError;
use thiserror::Error;

/// Why an explicit connect request did not connect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("no wallet provider is available")]
    ProviderAbsent,
    #[error("wallet authorization failed: {0}")]
    Authorization(#[source] ProviderError),
    #[error("the wallet did not authorize any account")]
    NoAccounts,
    #[error("wallet status controller was torn down")]
    Closed,
}

impl ConnectError {
    /// True when the user declined in the wallet prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ConnectError::Authorization(ProviderError::Rejected(_)))
    }
}
