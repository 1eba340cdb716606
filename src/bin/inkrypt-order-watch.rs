use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use inkrypt_cli::settings::{ApiArgs, StoreArgs};
use inkrypt_core::account::{AccountPage, Activation};
use inkrypt_core::orders::OrderStatus;
use inkrypt_core::AccountError;
use log::{info, warn};

/// Poll an inscription order until it reaches a terminal state.
///
/// Each status change is printed as one JSON line on stdout. When a wallet is
/// connected and the order is tracked locally, the stored status follows.
/// A failed poll ends the watch; nothing is retried.
#[derive(Parser)]
#[command(name = "inkrypt-order-watch", version)]
struct Cli {
    order_id: String,

    /// Delay between polls.
    #[arg(long, default_value_t = 5_000)]
    interval_ms: u64,

    /// Give up after this long (0 waits forever).
    #[arg(long, default_value_t = 0)]
    timeout_ms: u64,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    api: ApiArgs,
}

fn main() -> Result<()> {
    inkrypt_cli::init_logging();
    let cli = Cli::parse();
    let service = cli.api.service()?;

    let store = cli.store.open()?;
    let session = cli.store.session(&store);
    let mut page = match AccountPage::activate(&session, store) {
        Activation::Active(page) => Some(page),
        Activation::Redirect(_) => None,
    };

    let start = Instant::now();
    let mut last: Option<OrderStatus> = None;
    loop {
        let status = service.order_status(&cli.order_id)?;

        if last.as_ref() != Some(&status.status) {
            println!("{}", serde_json::to_string(&status)?);
            if let Some(page) = page.as_mut() {
                match page.refresh_order(&status) {
                    Ok(()) => {}
                    Err(AccountError::UnknownOrder(_)) => {
                        info!("order {} is not tracked locally", cli.order_id)
                    }
                    Err(err) => warn!("order status not saved locally: {err}"),
                }
            }
            last = Some(status.status.clone());
        }

        if status.status.is_terminal() {
            info!("order {} finished: {}", cli.order_id, status.status);
            return Ok(());
        }

        if cli.timeout_ms > 0 && start.elapsed() > Duration::from_millis(cli.timeout_ms) {
            eprintln!("timeout, order {} still {}", cli.order_id, status.status);
            std::process::exit(3);
        }

        thread::sleep(Duration::from_millis(cli.interval_ms));
    }
}
