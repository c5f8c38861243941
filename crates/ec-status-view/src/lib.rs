//! Presentation of a [`WalletStatus`].
//!
//! Rendering is a pure function of the status snapshot. Hosts turn the view
//! model into text (native) or markup (browser) and route the single action
//! back to `request_connection`.

use ec_types::ConnectionState;
use ec_wallet_core::{CONNECT_PROMPT, WalletStatus};
use std::fmt::{self, Write as _};

pub const TITLE: &str = "Ether Account Checker";
pub const VERIFIED_LABEL: &str = "Account is Verified";
pub const CONNECT_LABEL: &str = "Connect Wallet";
pub const DETAILS_LABEL: &str = "Ether Account Details:";
pub const UNIT_SUFFIX: &str = "ETH";
pub const BALANCE_PENDING: &str = "loading...";

/// `data-action` value carried by every button that triggers a connect.
pub const CONNECT_ACTION: &str = "connect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Disconnected {
        message: &'static str,
        error: Option<String>,
    },
    Connected {
        account: String,
        balance: Option<String>,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub screen: Screen,
    /// Label of the button that invokes `request_connection`.
    pub action_label: &'static str,
}

impl StatusView {
    pub fn render(status: &WalletStatus) -> Self {
        match (status.connection_state(), status.account()) {
            (ConnectionState::Connected, Some(account)) => StatusView {
                screen: Screen::Connected {
                    account: account.to_string(),
                    balance: status.balance().map(|b| format!("{b} {UNIT_SUFFIX}")),
                    error: status.error().map(ToString::to_string),
                },
                action_label: DETAILS_LABEL,
            },
            _ => StatusView {
                screen: Screen::Disconnected {
                    message: CONNECT_PROMPT,
                    error: status.error().map(ToString::to_string),
                },
                action_label: CONNECT_LABEL,
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.screen, Screen::Connected { .. })
    }

    /// Markup for the browser host. Buttons carry `data-action="connect"`.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<h3 class=\"title\">{}</h3>", escape(TITLE));

        match &self.screen {
            Screen::Disconnected { message, error } => {
                let _ = write!(html, "<p class=\"prompt\">{}</p>", escape(message));
                push_error(&mut html, error.as_deref());
                push_button(&mut html, self.action_label);
            }
            Screen::Connected {
                account,
                balance,
                error,
            } => {
                let _ = write!(
                    html,
                    "<h6 class=\"verified\">{} <span class=\"check\">&#10004;</span></h6>",
                    escape(VERIFIED_LABEL)
                );
                push_error(&mut html, error.as_deref());
                push_button(&mut html, self.action_label);
                html.push_str("<div class=\"details\"><h6>Your Ether</h6><ul>");
                let _ = write!(
                    html,
                    "<li class=\"label\">Account</li><li class=\"account\">{}</li>",
                    escape(account)
                );
                let _ = write!(
                    html,
                    "<li class=\"label\">Balance</li><li class=\"balance\">{}</li>",
                    escape(balance.as_deref().unwrap_or(BALANCE_PENDING))
                );
                html.push_str("</ul></div>");
            }
        }
        html
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;
        match &self.screen {
            Screen::Disconnected { message, error } => {
                writeln!(f, "{message}")?;
                if let Some(error) = error {
                    writeln!(f, "error: {error}")?;
                }
            }
            Screen::Connected {
                account,
                balance,
                error,
            } => {
                writeln!(f, "{VERIFIED_LABEL}")?;
                if let Some(error) = error {
                    writeln!(f, "error: {error}")?;
                }
                writeln!(f, "Account: {account}")?;
                writeln!(f, "Balance: {}", balance.as_deref().unwrap_or(BALANCE_PENDING))?;
            }
        }
        write!(f, "[{}]", self.action_label)
    }
}

fn push_error(html: &mut String, error: Option<&str>) {
    if let Some(error) = error {
        let _ = write!(html, "<p class=\"error\" role=\"alert\">{}</p>", escape(error));
    }
}

fn push_button(html: &mut String, label: &str) {
    let _ = write!(
        html,
        "<button type=\"button\" class=\"connect\" data-action=\"{CONNECT_ACTION}\">{}</button>",
        escape(label)
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
