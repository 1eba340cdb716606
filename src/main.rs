use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use inkrypt_cli::render::{account_text, AccountSnapshot};
use inkrypt_cli::settings::{ApiArgs, StoreArgs};
use inkrypt_core::account::{AccountPage, Activation, Route};
use inkrypt_core::orders::NewInscription;
use inkrypt_core::records::Address;
use inkrypt_core::store::{FileStore, LocalStore};
use inkrypt_core::AccountError;
use log::{info, warn};

#[derive(Parser)]
#[command(name = "inkrypt", version, about = "Inkrypt account dashboard")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the signed-in address's inscriptions, drafts and posts.
    Account {
        #[arg(long)]
        json: bool,
    },
    /// Record `address` as the signed-in wallet.
    Connect { address: String },
    /// Forget the signed-in wallet.
    Disconnect,
    #[command(subcommand)]
    Drafts(DraftsCommand),
    #[command(subcommand)]
    Order(OrderCommand),
}

#[derive(Subcommand)]
enum DraftsCommand {
    /// Hand a draft to the editor.
    Edit { id: String },
    /// Open the editor on a blank draft.
    New,
    /// Permanently delete a draft.
    Delete { id: String },
}

#[derive(Subcommand)]
enum OrderCommand {
    /// Create an inscription order.
    Create(CreateArgs),
    /// Query an order's status.
    Status {
        order_id: String,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Ask for a refund of an unfinished order.
    Refund {
        order_id: String,
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// Inline content to inscribe.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    content: Option<String>,

    /// File whose bytes are inscribed.
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(long, default_value = "text/plain;charset=utf-8")]
    content_type: String,

    /// Address receiving the inscription. Defaults to the signed-in address.
    #[arg(long)]
    receive_address: Option<String>,

    #[command(flatten)]
    api: ApiArgs,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn account_page(args: &StoreArgs) -> Result<Option<AccountPage<FileStore>>> {
    let store = args.open()?;
    let session = args.session(&store);
    match AccountPage::activate(&session, store) {
        Activation::Active(page) => Ok(Some(page)),
        Activation::Redirect(route) => {
            info!("not signed in, redirecting to {route:?}");
            Ok(None)
        }
    }
}

fn account_cmd(args: &StoreArgs, json: bool) -> Result<()> {
    let Some(page) = account_page(args)? else {
        return Ok(());
    };
    let snapshot = AccountSnapshot::of(&page);
    if json {
        print_json(&snapshot)
    } else {
        print!("{}", account_text(&snapshot));
        Ok(())
    }
}

fn drafts_cmd(args: &StoreArgs, command: DraftsCommand) -> Result<()> {
    let Some(mut page) = account_page(args)? else {
        return Ok(());
    };
    match command {
        DraftsCommand::Edit { id } => {
            let mut routes: Vec<Route> = Vec::new();
            page.edit_draft(&id, &mut routes)?;
            routes.iter().try_for_each(print_json)
        }
        DraftsCommand::New => {
            let mut routes: Vec<Route> = Vec::new();
            page.new_draft(&mut routes);
            routes.iter().try_for_each(print_json)
        }
        DraftsCommand::Delete { id } => {
            if page.delete_draft(&id)? {
                eprintln!("deleted draft {id}");
            } else {
                warn!("no stored draft {id} for {}", page.address());
            }
            Ok(())
        }
    }
}

fn order_cmd(args: &StoreArgs, command: OrderCommand) -> Result<()> {
    match command {
        OrderCommand::Create(create) => {
            let content = match (&create.content, &create.file) {
                (Some(content), _) => content.clone().into_bytes(),
                (None, Some(path)) => {
                    fs::read(path).with_context(|| format!("reading {}", path.display()))?
                }
                (None, None) => unreachable!("clap requires --content or --file"),
            };
            let mut page = account_page(args)?;
            let receive_address = create
                .receive_address
                .map(Address::from)
                .or_else(|| page.as_ref().map(|p| p.address().clone()))
                .context("no receive address: pass --receive-address or connect a wallet")?;

            let service = create.api.service()?;
            let order = service.create_order(&NewInscription::new(
                content,
                create.content_type,
                receive_address,
            ))?;
            info!("created order {} ({})", order.order_id, order.status);
            print_json(&order)?;
            if let Some(page) = page.as_mut() {
                if let Err(err) = page.track_order(&order) {
                    warn!("order {} not tracked locally: {err}", order.order_id);
                }
            }
            Ok(())
        }
        OrderCommand::Status { order_id, api } => {
            let status = api.service()?.order_status(&order_id)?;
            if let Some(mut page) = account_page(args)? {
                match page.refresh_order(&status) {
                    Ok(()) | Err(AccountError::UnknownOrder(_)) => {}
                    Err(err) => warn!("order status not saved locally: {err}"),
                }
            }
            print_json(&status)
        }
        OrderCommand::Refund { order_id, api } => {
            let refund = api.inscribe_client()?.refund_order(&order_id)?;
            print_json(&refund)
        }
    }
}

fn session_cmd(args: &StoreArgs, address: Option<Address>) -> Result<()> {
    if address.as_ref().is_some_and(|a| a.as_str().trim().is_empty()) {
        bail!("cannot connect a blank address");
    }
    let address = address.map(|a| Address::from(a.as_str().trim()));
    let store: LocalStore<FileStore> = args.open()?;
    store.set_active_address(address.as_ref())?;
    match address {
        Some(address) => info!("connected {address}"),
        None => info!("disconnected"),
    }
    Ok(())
}

fn main() -> Result<()> {
    inkrypt_cli::init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Account { json } => account_cmd(&cli.store, json),
        Command::Connect { address } => session_cmd(&cli.store, Some(Address::from(address))),
        Command::Disconnect => session_cmd(&cli.store, None),
        Command::Drafts(command) => drafts_cmd(&cli.store, command),
        Command::Order(command) => order_cmd(&cli.store, command),
    }
}
