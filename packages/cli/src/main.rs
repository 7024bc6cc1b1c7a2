//! `tportal`: Token Portal command-line client.
//!
//! Talks to the ledger canister through the same session and actor layer a
//! browser front end uses:
//!
//! - **`info`**, **`supply`**, **`balance`**, **`holders`**: anonymous reads.
//! - **`whoami`**: the principal of `--identity`, or anonymous.
//! - **`transfer`**, **`mint`**: signed updates; need `--identity`.
//! - **`check`**: step-by-step connection self-test.
//!
//! Connection settings come from the `TPORTAL_*` environment variables (see
//! `PortalConfig`). Log verbosity is controlled with `RUST_LOG`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use token_portal_session::contract::Principal;
use token_portal_session::{
    run_connection_check, ClientError, PageOrigin, PemIdentityProvider, PortalClient,
    PortalConfig, SessionState, StepStatus,
};
use tracing::info;

/// tportal: Token Portal ledger client
#[derive(Parser)]
#[command(name = "tportal", version, about, long_about = None)]
struct Cli {
    /// PEM file with the Ed25519 key to sign as. Omit to call anonymously.
    #[arg(long, global = true, env = "TPORTAL_IDENTITY_PEM", value_name = "FILE")]
    identity: Option<PathBuf>,

    /// Origin the client pretends to be served from. Selects the identity
    /// provider the same way a browser front end would.
    #[arg(long, global = true, env = "TPORTAL_ORIGIN", default_value = "http://localhost")]
    origin: String,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show token name, symbol, supply and creator.
    Info,

    /// Show the total supply.
    Supply,

    /// Show the balance of a principal.
    Balance {
        /// Principal text, e.g. `2vxsx-fae`.
        principal: String,
    },

    /// List all holders, largest balance first.
    Holders,

    /// Show who calls will be made as.
    Whoami,

    /// Transfer tokens to another principal.
    Transfer {
        /// Recipient principal.
        #[arg(long, value_name = "PRINCIPAL")]
        to: String,

        #[arg(long)]
        amount: u64,
    },

    /// Mint new tokens. Only the token creator may do this.
    Mint {
        /// Recipient principal.
        #[arg(long, value_name = "PRINCIPAL")]
        to: String,

        #[arg(long)]
        amount: u64,
    },

    /// Run the connection self-test.
    Check,
}

#[derive(Serialize)]
struct BalanceOutput {
    principal: String,
    balance: u64,
}

#[derive(Serialize)]
struct WhoamiOutput {
    principal: String,
    anonymous: bool,
    expires_at: Option<String>,
}

#[derive(Serialize)]
struct WriteOutput<T: Serialize> {
    to: String,
    amount: u64,
    outcome: T,
    success: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_portal_session=info,tportal=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = PortalConfig::from_env().unwrap_or_else(|e| fatal(&e.to_string()));
    let origin = PageOrigin::parse(&cli.origin)
        .unwrap_or_else(|e| fatal(&format!("--origin: {e}")));
    // Only consulted when --identity is given.
    let provider = PemIdentityProvider::new(cli.identity.clone().unwrap_or_default());
    let client = PortalClient::connect(config, Arc::new(provider), Arc::new(origin));

    if cli.identity.is_some() {
        match client.login().await {
            Ok(principal) => info!(%principal, "signed in"),
            Err(e) => fatal(&e.to_string()),
        }
    }

    let exit = run(&client, cli.command, cli.json).await.unwrap_or_else(|e| fatal(&e.to_string()));
    process::exit(exit);
}

/// Execute one command. Returns the process exit code.
async fn run(client: &PortalClient, command: Command, json: bool) -> Result<i32, ClientError> {
    match command {
        Command::Info => {
            let info = client.token_info().await?;
            if json {
                print_json(&info);
            } else {
                println!("name:         {}", info.name);
                println!("symbol:       {}", info.symbol);
                println!("total supply: {}", info.total_supply);
                println!("creator:      {}", info.creator);
            }
        }

        Command::Supply => {
            let supply = client.total_supply().await?;
            if json {
                print_json(&supply);
            } else {
                println!("{supply}");
            }
        }

        Command::Balance { principal } => {
            let balance = client.balance_of(&principal).await?;
            if json {
                print_json(&BalanceOutput {
                    principal: principal.trim().to_string(),
                    balance,
                });
            } else {
                println!("{balance}");
            }
        }

        Command::Holders => {
            let holders = client.holders().await?;
            if json {
                print_json(&holders);
            } else if holders.is_empty() {
                println!("no holders");
            } else {
                for user in &holders {
                    println!("{:>20}  {}", user.balance, user.user_principal);
                }
            }
        }

        Command::Whoami => {
            let principal = client.principal().unwrap_or_else(Principal::anonymous);
            let expires_at = match client.state() {
                SessionState::Authenticated { expires_at, .. } => expires_at.map(|t| t.to_rfc3339()),
                _ => None,
            };
            if json {
                print_json(&WhoamiOutput {
                    principal: principal.to_text(),
                    anonymous: !client.is_authenticated(),
                    expires_at,
                });
            } else {
                println!("{principal}");
                if let Some(expires_at) = expires_at {
                    println!("expires {expires_at}");
                }
            }
        }

        Command::Transfer { to, amount } => {
            require_identity(client);
            let outcome = client.transfer(&to, amount).await?;
            let success = outcome.is_success();
            if json {
                print_json(&WriteOutput { to, amount, outcome, success });
            } else {
                println!("{outcome}");
            }
            return Ok(if success { 0 } else { 1 });
        }

        Command::Mint { to, amount } => {
            require_identity(client);
            let outcome = client.mint(&to, amount).await?;
            let success = outcome.is_success();
            if json {
                print_json(&WriteOutput { to, amount, outcome, success });
            } else {
                println!("{outcome}");
            }
            return Ok(if success { 0 } else { 1 });
        }

        Command::Check => {
            let report = run_connection_check(client).await;
            if json {
                print_json(&report);
            } else {
                for step in &report.steps {
                    let mark = match step.status {
                        StepStatus::Passed => "ok  ",
                        StepStatus::Failed => "FAIL",
                        StepStatus::Skipped => "skip",
                    };
                    println!("[{mark}] {:<15} {}", step.name, step.detail);
                }
            }
            return Ok(if report.passed() { 0 } else { 1 });
        }
    }
    Ok(0)
}

fn require_identity(client: &PortalClient) {
    if !client.is_authenticated() {
        fatal("this command signs a call; pass --identity <FILE> or set TPORTAL_IDENTITY_PEM");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fatal(&format!("serializing output: {e}")),
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("tportal: {msg}");
    process::exit(2);
}
