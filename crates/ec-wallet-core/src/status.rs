use crate::ConnectError;
use ec_types::{AccountAddress, ConnectionState, Ether};

/// Snapshot of what the controller knows about the wallet.
///
/// Only the controller writes it; the balance always belongs to `account`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletStatus {
    account: Option<AccountAddress>,
    balance: Option<Ether>,
    error: Option<ConnectError>,
}

impl WalletStatus {
    pub fn connection_state(&self) -> ConnectionState {
        if self.account.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub fn account(&self) -> Option<&AccountAddress> {
        self.account.as_ref()
    }

    pub fn balance(&self) -> Option<Ether> {
        self.balance
    }

    /// Last connection failure, kept until the next successful read.
    pub fn error(&self) -> Option<&ConnectError> {
        self.error.as_ref()
    }

    pub(crate) fn adopt_account(&mut self, account: AccountAddress) -> bool {
        let had_error = self.error.take().is_some();
        if self.account.as_ref() == Some(&account) {
            return had_error;
        }
        self.account = Some(account);
        self.balance = None;
        true
    }

    pub(crate) fn set_balance(&mut self, account: &AccountAddress, balance: Ether) -> bool {
        if self.account.as_ref() != Some(account) {
            return false;
        }
        let changed = self.balance != Some(balance) || self.error.is_some();
        self.balance = Some(balance);
        self.error = None;
        changed
    }

    pub(crate) fn clear_account(&mut self) -> bool {
        let changed = self.account.is_some() || self.balance.is_some();
        self.account = None;
        self.balance = None;
        changed
    }

    pub(crate) fn record_error(&mut self, error: ConnectError) -> bool {
        let changed = self.error.as_ref() != Some(&error);
        self.error = Some(error);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_types::Wei;

    #[test]
    fn switching_account_drops_the_old_balance() {
        let mut status = WalletStatus::default();
        assert_eq!(status.connection_state(), ConnectionState::Disconnected);

        status.adopt_account("0xAAA".into());
        status.set_balance(&"0xAAA".into(), Wei(1).to_ether());
        assert!(status.balance().is_some());

        assert!(!status.adopt_account("0xAAA".into()));
        assert!(status.balance().is_some());

        assert!(status.adopt_account("0xBBB".into()));
        assert_eq!(status.balance(), None);
        assert_eq!(status.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn balance_for_another_account_is_refused() {
        let mut status = WalletStatus::default();
        status.adopt_account("0xBBB".into());
        assert!(!status.set_balance(&"0xAAA".into(), Wei(5).to_ether()));
        assert_eq!(status.balance(), None);
    }

    #[test]
    fn clearing_disconnects() {
        let mut status = WalletStatus::default();
        status.adopt_account("0xAAA".into());
        assert!(status.clear_account());
        assert!(!status.is_connected());
        assert_eq!(status.account(), None);
        assert!(!status.clear_account());
    }
}
