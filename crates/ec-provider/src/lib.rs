use async_trait::async_trait;
use ec_types::{AccountAddress, QuantityError, Wei};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tokio::sync::mpsc;

mod config;
#[cfg(feature = "mock")]
pub mod mock;

pub use config::ProviderConfig;

/// EIP-1193 code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no wallet provider is available")]
    Unavailable,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Maps a JSON-RPC / EIP-1193 error object onto the taxonomy.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == USER_REJECTED_CODE {
            ProviderError::Rejected(message)
        } else {
            ProviderError::Rpc { code, message }
        }
    }
}

impl From<QuantityError> for ProviderError {
    fn from(err: QuantityError) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

/// JSON-RPC error object as carried in responses and EIP-1193 rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl From<RpcErrorObject> for ProviderError {
    fn from(err: RpcErrorObject) -> Self {
        ProviderError::from_rpc(err.code, err.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving half of an `accountsChanged` subscription.
#[derive(Debug)]
pub struct AccountsSubscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Vec<AccountAddress>>,
}

impl AccountsSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn into_parts(self) -> (SubscriptionId, mpsc::UnboundedReceiver<Vec<AccountAddress>>) {
        (self.id, self.receiver)
    }
}

/// Fan-out of account-change notifications to live subscriptions.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: Cell<u64>,
    senders: RefCell<HashMap<SubscriptionId, mpsc::UnboundedSender<Vec<AccountAddress>>>>,
}

impl ListenerRegistry {
    pub fn subscribe(&self) -> AccountsSubscription {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders.borrow_mut().insert(id, sender);
        AccountsSubscription { id, receiver }
    }

    /// Drops the sender so the matching receiver observes end-of-stream.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.senders.borrow_mut().remove(&id).is_some()
    }

    /// Delivers `accounts` to every live subscription and prunes closed ones.
    /// Returns the number of subscriptions reached.
    pub fn notify(&self, accounts: &[AccountAddress]) -> usize {
        let mut senders = self.senders.borrow_mut();
        senders.retain(|_, sender| sender.send(accounts.to_vec()).is_ok());
        senders.len()
    }

    pub fn len(&self) -> usize {
        self.senders.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.borrow().is_empty()
    }
}

/// Wallet capability consumed by the status controller.
///
/// Futures are not `Send`: providers live on the single UI thread (the
/// browser event loop, or a current-thread runtime natively).
#[async_trait(?Send)]
pub trait WalletProvider {
    fn name(&self) -> &str;

    /// Currently authorized accounts, without prompting the user.
    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError>;

    /// Asks for authorization; may prompt the user and may be rejected.
    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError>;

    async fn balance(&self, account: &AccountAddress) -> Result<Wei, ProviderError>;

    fn subscribe_accounts_changed(&self) -> Result<AccountsSubscription, ProviderError>;

    fn remove_listener(&self, id: SubscriptionId);
}

#[async_trait(?Send)]
impl<P: WalletProvider + ?Sized> WalletProvider for Rc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        (**self).accounts().await
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        (**self).request_accounts().await
    }

    async fn balance(&self, account: &AccountAddress) -> Result<Wei, ProviderError> {
        (**self).balance(account).await
    }

    fn subscribe_accounts_changed(&self) -> Result<AccountsSubscription, ProviderError> {
        (**self).subscribe_accounts_changed()
    }

    fn remove_listener(&self, id: SubscriptionId) {
        (**self).remove_listener(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_code_maps_to_rejected() {
        assert_eq!(
            ProviderError::from_rpc(4001, "User rejected the request."),
            ProviderError::Rejected("User rejected the request.".to_owned())
        );
        assert_eq!(
            ProviderError::from_rpc(-32603, "internal"),
            ProviderError::Rpc {
                code: -32603,
                message: "internal".to_owned()
            }
        );
    }

    #[test]
    fn registry_delivers_and_prunes() {
        let registry = ListenerRegistry::default();
        let first = registry.subscribe();
        let second = registry.subscribe();
        assert_ne!(first.id(), second.id());

        let (_, mut rx) = first.into_parts();
        drop(second);

        let accounts = vec![AccountAddress::from("0xAAA")];
        assert_eq!(registry.notify(&accounts), 1);
        assert_eq!(rx.try_recv().ok(), Some(accounts));
    }

    #[test]
    fn removed_listener_sees_end_of_stream() {
        let registry = ListenerRegistry::default();
        let sub = registry.subscribe();
        let id = sub.id();
        let (_, mut rx) = sub.into_parts();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
