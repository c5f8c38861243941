use crate::{ConnectError, WalletStatus};
use ec_provider::{SubscriptionId, WalletProvider};
use ec_types::{AccountAddress, Ether};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Instruction shown (and logged) while no wallet is connected.
pub const CONNECT_PROMPT: &str = "Connect your MetaMask wallet to check your balance";

/// Keeps the wallet account and its balance in sync with a provider.
///
/// Cheap to clone; clones share state. Every state change is published on a
/// `watch` channel, see [`WalletStatusController::subscribe`].
pub struct WalletStatusController<P: WalletProvider> {
    inner: Rc<Inner<P>>,
}

impl<P: WalletProvider> Clone for WalletStatusController<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct Inner<P: WalletProvider> {
    provider: Option<P>,
    status: watch::Sender<WalletStatus>,
    // Bumped by every operation that writes state; responses carrying an
    // older token are dropped.
    request_token: Cell<u64>,
    subscription: Cell<Option<SubscriptionId>>,
    notifications: RefCell<Option<mpsc::UnboundedReceiver<Vec<AccountAddress>>>>,
    initialized: Cell<bool>,
    torn_down: Cell<bool>,
}

impl<P: WalletProvider> Inner<P> {
    fn release(&self) {
        self.torn_down.set(true);
        self.request_token.set(self.request_token.get() + 1);
        if let Some(id) = self.subscription.take() {
            if let Some(provider) = &self.provider {
                provider.remove_listener(id);
            }
            debug!(subscription = id.0, "removed accountsChanged listener");
        }
        if let Ok(mut notifications) = self.notifications.try_borrow_mut() {
            notifications.take();
        }
    }
}

impl<P: WalletProvider> Drop for Inner<P> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<P: WalletProvider> WalletStatusController<P> {
    /// `None` models a host without an injected wallet.
    pub fn new(provider: Option<P>) -> Self {
        let (status, _) = watch::channel(WalletStatus::default());
        Self {
            inner: Rc::new(Inner {
                provider,
                status,
                request_token: Cell::new(0),
                subscription: Cell::new(None),
                notifications: RefCell::new(None),
                initialized: Cell::new(false),
                torn_down: Cell::new(false),
            }),
        }
    }

    pub fn with_provider(provider: P) -> Self {
        Self::new(Some(provider))
    }

    pub fn without_provider() -> Self {
        Self::new(None)
    }

    pub fn provider(&self) -> Option<&P> {
        self.inner.provider.as_ref()
    }

    pub fn has_provider(&self) -> bool {
        self.inner.provider.is_some()
    }

    pub fn status(&self) -> WalletStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.subscription.get().is_some()
    }

    /// Start-up: silent account read plus the `accountsChanged` subscription.
    ///
    /// The subscription is taken before the first read so a switch made in
    /// the wallet while the read is in flight is not lost.
    pub async fn initialize(&self) {
        if self.inner.torn_down.get() {
            debug!("initialize after teardown ignored");
            return;
        }
        if self.inner.initialized.replace(true) {
            warn!("wallet status controller already initialized");
            return;
        }
        let Some(provider) = self.provider() else {
            warn!("no wallet provider detected: {CONNECT_PROMPT}");
            return;
        };

        match provider.subscribe_accounts_changed() {
            Ok(subscription) => {
                let (id, receiver) = subscription.into_parts();
                self.inner.subscription.set(Some(id));
                *self.inner.notifications.borrow_mut() = Some(receiver);
                debug!(provider = provider.name(), subscription = id.0, "listening for accountsChanged");
            }
            Err(err) => {
                warn!(provider = provider.name(), %err, "could not subscribe to account changes");
            }
        }

        self.refresh_from_provider().await;
    }

    /// Reads the authorized accounts without prompting, then the balance of
    /// the first one. Provider failures are logged and leave state untouched.
    pub async fn refresh_from_provider(&self) {
        let Some(provider) = self.provider() else {
            debug!("refresh skipped: no wallet provider");
            return;
        };
        let token = self.begin();

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(%err, "failed to read authorized accounts");
                return;
            }
        };
        if self.is_superseded(token) {
            debug!(token, "discarding superseded account read");
            return;
        }

        let Some(account) = accounts.into_iter().next() else {
            info!("wallet reports no authorized accounts");
            return;
        };
        self.update(|status| status.adopt_account(account.clone()));

        let wei = match provider.balance(&account).await {
            Ok(wei) => wei,
            Err(err) => {
                warn!(account = %account, %err, "failed to read balance");
                return;
            }
        };
        if self.is_superseded(token) {
            debug!(token, account = %account, "discarding superseded balance");
            return;
        }

        let balance: Ether = wei.to_ether();
        self.update(|status| status.set_balance(&account, balance));
        info!(account = %account, balance = %balance, "wallet balance updated");
    }

    /// User-initiated connect: asks the wallet for authorization, then
    /// re-reads the balance.
    ///
    /// Failures are logged and recorded on the status so the view can show
    /// them; the previous account and balance are kept. A response that
    /// arrives after teardown is dropped.
    pub async fn request_connection(&self) -> Result<(), ConnectError> {
        let Some(provider) = self.provider() else {
            warn!("{CONNECT_PROMPT}");
            return Err(ConnectError::ProviderAbsent);
        };

        if self.inner.torn_down.get() {
            return Err(ConnectError::Closed);
        }

        let response = provider.request_accounts().await;
        if self.inner.torn_down.get() {
            debug!("connection response after teardown ignored");
            return Err(ConnectError::Closed);
        }
        let accounts = match response {
            Ok(accounts) => accounts,
            Err(err) => {
                let err = ConnectError::Authorization(err);
                warn!(%err, "wallet connection request failed");
                self.update(|status| status.record_error(err.clone()));
                return Err(err);
            }
        };

        let Some(account) = accounts.into_iter().next() else {
            let err = ConnectError::NoAccounts;
            warn!(%err, "wallet connection request failed");
            self.update(|status| status.record_error(err.clone()));
            return Err(err);
        };

        self.begin();
        info!(account = %account, "wallet connected");
        self.update(|status| status.adopt_account(account));
        self.refresh_from_provider().await;
        Ok(())
    }

    /// Handler for the provider's `accountsChanged` notification.
    pub async fn on_accounts_changed(&self, accounts: Vec<AccountAddress>) {
        if self.inner.torn_down.get() {
            debug!("account change after teardown ignored");
            return;
        }
        self.begin();
        match accounts.into_iter().next() {
            Some(account) => {
                info!(account = %account, "wallet account changed");
                self.update(|status| status.adopt_account(account));
                self.refresh_from_provider().await;
            }
            None => {
                info!("wallet disconnected");
                self.update(WalletStatus::clear_account);
            }
        }
    }

    /// Handles every notification already queued, without waiting.
    pub async fn process_pending_notifications(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.inner.notifications.borrow_mut().as_mut() {
                Some(receiver) => receiver.try_recv().ok(),
                None => None,
            };
            let Some(accounts) = next else {
                break;
            };
            self.on_accounts_changed(accounts).await;
            handled += 1;
        }
        handled
    }

    /// Handles notifications as they arrive until teardown closes the stream.
    pub async fn listen(&self) {
        let Some(mut receiver) = self.inner.notifications.borrow_mut().take() else {
            debug!("no account change subscription to listen on");
            return;
        };
        while let Some(accounts) = receiver.recv().await {
            if self.inner.torn_down.get() {
                break;
            }
            self.on_accounts_changed(accounts).await;
        }
        debug!("account change stream closed");
    }

    /// Removes the `accountsChanged` listener. Idempotent.
    pub fn teardown(&self) {
        self.inner.release();
    }

    fn begin(&self) -> u64 {
        let token = self.inner.request_token.get() + 1;
        self.inner.request_token.set(token);
        token
    }

    fn is_superseded(&self, token: u64) -> bool {
        self.inner.torn_down.get() || self.inner.request_token.get() != token
    }

    fn update(&self, apply: impl FnOnce(&mut WalletStatus) -> bool) {
        self.inner.status.send_if_modified(apply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_provider::mock::MockProvider;
    use ec_provider::ProviderError;
    use ec_types::{ConnectionState, Wei};

    const TWO_AND_A_HALF: Wei = Wei(2_500_000_000_000_000_000);

    #[tokio::test]
    async fn empty_account_list_stays_disconnected() {
        let controller = WalletStatusController::with_provider(MockProvider::new());
        controller.initialize().await;

        let status = controller.status();
        assert_eq!(status.connection_state(), ConnectionState::Disconnected);
        assert_eq!(status.account(), None);
        assert_eq!(status.balance(), None);
    }

    #[tokio::test]
    async fn first_account_wins() {
        let provider = MockProvider::with_accounts(["0xAAA", "0xDDD", "0xEEE"]);
        provider.set_balance("0xAAA", TWO_AND_A_HALF);
        provider.set_balance("0xDDD", Wei(1));
        let controller = WalletStatusController::with_provider(provider);

        controller.refresh_from_provider().await;

        let status = controller.status();
        assert_eq!(status.account(), Some(&AccountAddress::from("0xAAA")));
        assert_eq!(status.balance(), Some(TWO_AND_A_HALF.to_ether()));
        assert_eq!(
            controller.provider().unwrap().balance_calls(),
            vec![AccountAddress::from("0xAAA")]
        );
    }

    #[tokio::test]
    async fn read_failure_keeps_last_known_state() {
        let provider = MockProvider::with_accounts(["0xAAA"]);
        provider.set_balance("0xAAA", TWO_AND_A_HALF);
        let controller = WalletStatusController::with_provider(provider);
        controller.refresh_from_provider().await;
        let before = controller.status();

        let provider = controller.provider().unwrap();
        provider.set_accounts(["0xBBB"]);
        provider.fail_next_accounts(ProviderError::Transport("offline".to_owned()));
        controller.refresh_from_provider().await;
        assert_eq!(controller.status(), before);

        provider.set_accounts(["0xAAA"]);
        provider.fail_next_balance(ProviderError::Transport("offline".to_owned()));
        controller.refresh_from_provider().await;
        assert_eq!(controller.status(), before);
    }

    #[tokio::test]
    async fn refresh_does_not_disconnect_on_empty_list() {
        let provider = MockProvider::with_accounts(["0xAAA"]);
        let controller = WalletStatusController::with_provider(provider);
        controller.refresh_from_provider().await;

        controller.provider().unwrap().set_accounts(Vec::<&str>::new());
        controller.refresh_from_provider().await;
        assert!(controller.status().is_connected());
    }

    #[tokio::test]
    async fn empty_notification_disconnects() {
        let provider = MockProvider::with_accounts(["0xAAA"]);
        provider.set_balance("0xAAA", TWO_AND_A_HALF);
        let controller = WalletStatusController::with_provider(provider);
        controller.initialize().await;
        assert!(controller.status().is_connected());

        controller.on_accounts_changed(Vec::new()).await;

        let status = controller.status();
        assert_eq!(status.connection_state(), ConnectionState::Disconnected);
        assert_eq!(status.account(), None);
        assert_eq!(status.balance(), None);
    }

    #[tokio::test]
    async fn rejected_authorization_is_recorded_not_fatal() {
        let provider = MockProvider::new();
        provider.set_request_response(Err(ProviderError::Rejected(
            "User rejected the request.".to_owned(),
        )));
        let controller = WalletStatusController::with_provider(provider);

        let err = controller.request_connection().await.unwrap_err();
        assert!(err.is_user_rejection());

        let status = controller.status();
        assert!(!status.is_connected());
        assert_eq!(status.error(), Some(&err));

        controller.provider().unwrap().set_request_response(Ok(vec!["0xBBB".into()]));
        controller.request_connection().await.unwrap();
        assert_eq!(controller.status().error(), None);
        assert!(controller.status().is_connected());
    }

    #[tokio::test]
    async fn empty_authorization_does_not_connect() {
        let provider = MockProvider::new();
        provider.set_request_response(Ok(Vec::new()));
        let controller = WalletStatusController::with_provider(provider);

        assert_eq!(
            controller.request_connection().await,
            Err(ConnectError::NoAccounts)
        );
        assert!(!controller.status().is_connected());
    }

    #[tokio::test]
    async fn missing_provider_is_a_no_op() {
        let controller = WalletStatusController::<MockProvider>::without_provider();
        controller.initialize().await;
        controller.refresh_from_provider().await;

        assert_eq!(
            controller.request_connection().await,
            Err(ConnectError::ProviderAbsent)
        );
        assert_eq!(controller.status(), WalletStatus::default());
        controller.teardown();
    }

    #[tokio::test]
    async fn teardown_is_idempotent_and_safe_before_initialize() {
        let controller = WalletStatusController::with_provider(MockProvider::with_accounts(["0xAAA"]));
        controller.teardown();
        controller.teardown();
        controller.initialize().await;
        assert!(!controller.is_listening());
        assert_eq!(controller.provider().unwrap().listener_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_failure_does_not_block_the_first_read() {
        let provider = MockProvider::with_accounts(["0xAAA"]);
        provider.fail_subscribe(ProviderError::Unavailable);
        let controller = WalletStatusController::with_provider(provider);

        controller.initialize().await;
        assert!(!controller.is_listening());
        assert!(controller.status().is_connected());
    }

    #[tokio::test]
    async fn status_changes_are_published() {
        let provider = MockProvider::with_accounts(["0xAAA"]);
        provider.set_balance("0xAAA", TWO_AND_A_HALF);
        let controller = WalletStatusController::with_provider(provider);
        let mut updates = controller.subscribe();

        controller.initialize().await;
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().balance(),
            Some(TWO_AND_A_HALF.to_ether())
        );

        controller.refresh_from_provider().await;
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn dropping_the_controller_removes_the_listener() {
        let provider = Rc::new(MockProvider::with_accounts(["0xAAA"]));
        let controller = WalletStatusController::with_provider(Rc::clone(&provider));
        controller.initialize().await;
        assert_eq!(provider.listener_count(), 1);

        drop(controller);
        assert_eq!(provider.listener_count(), 0);
    }
}
