//! Scripted in-memory provider for tests and demos.

use crate::{AccountsSubscription, ListenerRegistry, ProviderError, SubscriptionId, WalletProvider};
use async_trait::async_trait;
use ec_types::{AccountAddress, Wei};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tokio::sync::Notify;

#[derive(Default)]
pub struct MockProvider {
    accounts: RefCell<Vec<AccountAddress>>,
    balances: RefCell<HashMap<AccountAddress, Wei>>,
    request_response: RefCell<Option<Result<Vec<AccountAddress>, ProviderError>>>,
    accounts_failures: RefCell<VecDeque<ProviderError>>,
    balance_failures: RefCell<VecDeque<ProviderError>>,
    balance_gates: RefCell<HashMap<AccountAddress, Rc<Notify>>>,
    request_gate: RefCell<Option<Rc<Notify>>>,
    subscribe_failure: RefCell<Option<ProviderError>>,
    listeners: ListenerRegistry,
    accounts_calls: Cell<usize>,
    request_calls: Cell<usize>,
    balance_calls: RefCell<Vec<AccountAddress>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts<I, A>(accounts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AccountAddress>,
    {
        let provider = Self::default();
        provider.set_accounts(accounts);
        provider
    }

    pub fn set_accounts<I, A>(&self, accounts: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<AccountAddress>,
    {
        *self.accounts.borrow_mut() = accounts.into_iter().map(Into::into).collect();
    }

    pub fn set_balance(&self, account: impl Into<AccountAddress>, wei: Wei) {
        self.balances.borrow_mut().insert(account.into(), wei);
    }

    /// Scripts the next `request_accounts` outcome. A successful response
    /// also becomes the authorized account list.
    pub fn set_request_response(&self, response: Result<Vec<AccountAddress>, ProviderError>) {
        *self.request_response.borrow_mut() = Some(response);
    }

    pub fn fail_next_accounts(&self, err: ProviderError) {
        self.accounts_failures.borrow_mut().push_back(err);
    }

    pub fn fail_next_balance(&self, err: ProviderError) {
        self.balance_failures.borrow_mut().push_back(err);
    }

    pub fn fail_subscribe(&self, err: ProviderError) {
        *self.subscribe_failure.borrow_mut() = Some(err);
    }

    /// Holds `balance` calls for `account` until the returned gate is notified.
    pub fn gate_balance(&self, account: impl Into<AccountAddress>) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.balance_gates
            .borrow_mut()
            .insert(account.into(), Rc::clone(&gate));
        gate
    }

    /// Holds the next `request_accounts` call until the returned gate is
    /// notified, like a wallet prompt the user has not answered yet.
    pub fn gate_request_accounts(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.request_gate.borrow_mut() = Some(Rc::clone(&gate));
        gate
    }

    /// Simulates the wallet UI switching accounts.
    pub fn emit_accounts_changed<I, A>(&self, accounts: I) -> usize
    where
        I: IntoIterator<Item = A>,
        A: Into<AccountAddress>,
    {
        let accounts: Vec<AccountAddress> = accounts.into_iter().map(Into::into).collect();
        self.set_accounts(accounts.clone());
        self.listeners.notify(&accounts)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn accounts_calls(&self) -> usize {
        self.accounts_calls.get()
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.get()
    }

    pub fn balance_calls(&self) -> Vec<AccountAddress> {
        self.balance_calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl WalletProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.accounts_calls.set(self.accounts_calls.get() + 1);
        if let Some(err) = self.accounts_failures.borrow_mut().pop_front() {
            return Err(err);
        }
        Ok(self.accounts.borrow().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<AccountAddress>, ProviderError> {
        self.request_calls.set(self.request_calls.get() + 1);
        let gate = self.request_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let scripted = self.request_response.borrow_mut().take();
        match scripted {
            Some(Ok(accounts)) => {
                self.set_accounts(accounts.clone());
                Ok(accounts)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.accounts.borrow().clone()),
        }
    }

    async fn balance(&self, account: &AccountAddress) -> Result<Wei, ProviderError> {
        self.balance_calls.borrow_mut().push(account.clone());
        let gate = self.balance_gates.borrow_mut().remove(account);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.balance_failures.borrow_mut().pop_front() {
            return Err(err);
        }
        Ok(self
            .balances
            .borrow()
            .get(account)
            .copied()
            .unwrap_or(Wei::ZERO))
    }

    fn subscribe_accounts_changed(&self) -> Result<AccountsSubscription, ProviderError> {
        if let Some(err) = self.subscribe_failure.borrow_mut().take() {
            return Err(err);
        }
        Ok(self.listeners.subscribe())
    }

    fn remove_listener(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}
