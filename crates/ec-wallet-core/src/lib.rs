//! Wallet connection state synchronization.
//!
//! [`WalletStatusController`] mediates between a [`WalletProvider`] and the
//! account/balance pair shown to the user.

mod controller;
mod error;
mod status;

pub use controller::{CONNECT_PROMPT, WalletStatusController};
pub use ec_provider::WalletProvider;
pub use error::ConnectError;
pub use status::WalletStatus;
