//! LedgerLink demo CLI
//!
//! Drives the session coordinator against the in-process simulated wallet:
//! connect, sign a payment (XRPL) or a message (EVM), then disconnect.
//!
//! ```text
//! ledgerlink networks
//! ledgerlink demo --network xrpl:1 --amount 250000 --destination-tag 7
//! ledgerlink demo --network eip155:7672 --message "Hello World"
//! RUST_LOG=ledgerlink_client_core=debug ledgerlink demo --reject
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use ledgerlink_client_core::caip::{AccountId, ChainId};
use ledgerlink_client_core::protocol::ApprovalPrompt;
use ledgerlink_client_core::sim::{ApprovalMode, SimulatedWallet, SimulatedWalletFactory};
use ledgerlink_client_core::xrpl::{XrplPayment, normalize_amount};
use ledgerlink_client_core::{
    ClientConfig, ConnectOutcome, CoordinatorBuilder, CoordinatorEvent, DisconnectOutcome, Network,
    SessionCoordinator, SignOptions,
};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Wallet-pairing demo for XRPL and EVM networks",
    long_about = None
)]
struct Cli {
    /// Project identifier for the pairing relay
    #[arg(long, env = "LEDGERLINK_PROJECT_ID", global = true)]
    project_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the networks proposed on connect
    Networks,
    /// Connect to the simulated wallet, sign once and disconnect
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Chain to sign on
    #[arg(short, long, default_value = "xrpl:1")]
    network: String,

    /// Payment destination (XRPL)
    #[arg(short, long, default_value = "rGA3kwmB5hBnvs6VW1fnGKysJfBCUazDrD")]
    destination: String,

    /// Payment amount in drops (XRPL)
    #[arg(short, long, default_value = "100000")]
    amount: String,

    /// Destination tag (XRPL)
    #[arg(short = 't', long)]
    destination_tag: Option<u32>,

    /// Message to sign (EVM)
    #[arg(short, long, default_value = "Hello World")]
    message: String,

    /// Have the wallet reject the connection
    #[arg(long)]
    reject: bool,
}

/// Prints the pairing URI for the user to paste into a wallet
struct TerminalPrompt;

impl ApprovalPrompt for TerminalPrompt {
    fn open(&self, uri: &str, chains: &[ChainId]) {
        println!();
        println!("🔗 Pair your wallet with this URI:");
        println!("   {}", uri);
        for chain in chains {
            let name = Network::from_chain_id(chain)
                .map(|n| n.display_name())
                .unwrap_or("unknown");
            println!("   • {} ({})", chain, name);
        }
        println!();
    }

    fn close(&self) {
        println!("🔒 Pairing prompt closed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ledgerlink_client_core=info".parse()?)
                .add_directive("ledgerlink=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Networks => {
            list_networks();
            Ok(())
        }
        Command::Demo(args) => run_demo(cli.project_id, args).await,
    }
}

fn list_networks() {
    for network in Network::ALL {
        println!(
            "{:<14} {:<14} {}",
            network.chain_id().to_string(),
            network.display_name(),
            network.methods().join(", ")
        );
    }
}

async fn run_demo(project_id: Option<String>, args: DemoArgs) -> Result<()> {
    let chain_id: ChainId = args.network.parse().context("invalid --network")?;

    let mut config = ClientConfig::from_env()?;
    if let Some(project_id) = project_id {
        config.project_id = project_id;
    }

    let wallet = SimulatedWallet::new();
    if args.reject {
        wallet.set_mode(ApprovalMode::Reject);
    }

    let coordinator = CoordinatorBuilder::new()
        .config(config)
        .prompt(TerminalPrompt)
        .factory(SimulatedWalletFactory::new(wallet))
        .build()?;

    spawn_event_logger(&coordinator);

    info!("🚀 Initializing pairing client");
    coordinator.ensure_client().await?;

    match coordinator.connect(None).await {
        ConnectOutcome::Connected(session) => {
            info!("✅ Connected, session {}", session.topic);
        }
        ConnectOutcome::Failed(e) => {
            error!("❌ Connection failed: {}", e);
            return Ok(());
        }
        ConnectOutcome::NoClient => bail!("pairing client is not initialized"),
    }

    let accounts = coordinator.accounts().await;
    for account in &accounts {
        println!("👛 {}", account);
    }

    let account: AccountId = accounts
        .iter()
        .filter_map(|a| a.parse::<AccountId>().ok())
        .find(|a| a.chain_id() == &chain_id)
        .with_context(|| format!("wallet granted no account on {}", chain_id))?;

    let result = match chain_id.namespace() {
        "xrpl" => sign_payment(&coordinator, &account, &args).await,
        _ => {
            info!("✍️  Requesting personal_sign from {}", account.address());
            coordinator
                .personal_sign(&chain_id, &args.message, account.address())
                .await
                .map_err(Into::into)
        }
    };

    match result {
        Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
        Err(e) => error!("❌ Request failed: {:#}", e),
    }

    match coordinator.disconnect().await {
        DisconnectOutcome::Disconnected { topic } => info!("👋 Disconnected {}", topic),
        DisconnectOutcome::ResetAfterError { topic, error } => {
            warn!("⚠️ Disconnect notice for {} failed: {}", topic, error)
        }
        DisconnectOutcome::NoSession => {}
    }

    Ok(())
}

async fn sign_payment(
    coordinator: &SessionCoordinator,
    account: &AccountId,
    args: &DemoArgs,
) -> Result<serde_json::Value> {
    let mut payment = XrplPayment::new(
        account.address(),
        args.destination.as_str(),
        normalize_amount(&args.amount),
    );
    if let Some(tag) = args.destination_tag {
        payment = payment.with_destination_tag(tag);
    }
    if !payment.is_sendable() {
        bail!("payment is incomplete or has a zero amount: {:?}", payment);
    }

    info!(
        "💸 Requesting signature for {} drops to {}",
        payment.amount, payment.destination
    );
    let response = coordinator
        .sign_transaction(
            account.chain_id(),
            payment.to_tx_json(),
            Some(SignOptions::autofill_and_submit()),
        )
        .await?;
    Ok(response)
}

fn spawn_event_logger(coordinator: &Arc<SessionCoordinator>) {
    let mut events = coordinator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(CoordinatorEvent::SessionConnected { topic, accounts }) => {
                    info!("📣 session {} connected with {} accounts", topic, accounts.len())
                }
                Ok(CoordinatorEvent::ConnectFailed { reason }) => {
                    info!("📣 connect failed: {}", reason)
                }
                Ok(event) => tracing::debug!(?event, "coordinator event"),
                Err(e) => warn!("event stream lagged: {}", e),
            }
        }
    });
}
