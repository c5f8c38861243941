use anyhow::Context;
use ec_provider::ProviderConfig;
use ec_provider_rpc::HttpRpcProvider;
use ec_status_view::StatusView;
use ec_wallet_core::WalletStatusController;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Silent read of the node's authorized accounts.
    Status,
    /// Explicit authorization request first.
    Connect,
}

fn parse_command(arg: Option<&str>) -> anyhow::Result<Command> {
    match arg {
        None | Some("status") => Ok(Command::Status),
        Some("connect") => Ok(Command::Connect),
        Some(other) => anyhow::bail!("unknown command `{other}` (expected `status` or `connect`)"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let arg = std::env::args().nth(1);
    let command = parse_command(arg.as_deref())?;

    let config = ProviderConfig::from_env();
    let provider = HttpRpcProvider::new(&config);
    info!(endpoint = %config.endpoint_url, ?command, "ether-checker starting");

    let controller = WalletStatusController::with_provider(provider);
    controller.initialize().await;

    let outcome = match command {
        Command::Status => Ok(()),
        Command::Connect => controller.request_connection().await,
    };

    println!("{}", StatusView::render(&controller.status()));
    controller.teardown();

    outcome.context("wallet connection failed")
}
