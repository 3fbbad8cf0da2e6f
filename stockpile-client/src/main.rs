//! Command-line front end for a Stockpile backend.
//!
//! ```text
//! stockpile --config stockpile.toml list items [page]
//! stockpile --config stockpile.toml create products <name> <price>
//! stockpile --config stockpile.toml update items <id> <name> <price>
//! stockpile --config stockpile.toml delete items <id>
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use stockpile_client::{error_message, ClientConfig, ClientError, InventoryClient, ListView};
use stockpile_core::{Record, RecordId, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command line interface for a Stockpile inventory backend
#[derive(Parser, Debug)]
#[command(name = "stockpile")]
#[command(about = "List and edit items and products through the Stockpile cache")]
#[command(version)]
struct Cli {
    /// Path to the client configuration file
    #[arg(short, long, env = "STOCKPILE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Show one page of a collection
    List {
        resource: ResourceArg,
        #[arg(default_value_t = 1)]
        page: u32,
    },
    /// Create a record
    Create {
        resource: ResourceArg,
        name: String,
        price: f64,
    },
    /// Replace name and price of a record
    Update {
        resource: ResourceArg,
        id: RecordId,
        name: String,
        price: f64,
    },
    /// Delete a record
    Delete { resource: ResourceArg, id: RecordId },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ResourceArg {
    Items,
    Products,
}

impl From<ResourceArg> for Resource {
    fn from(arg: ResourceArg) -> Self {
        match arg {
            ResourceArg::Items => Resource::Items,
            ResourceArg::Products => Resource::Products,
        }
    }
}

fn print_record(record: &Record) {
    println!("{:>6}  {:<32} {:>10.2}", record.id, record.name, record.price);
}

fn print_view(view: &ListView) {
    if let Some(error) = &view.error {
        eprintln!("error: {}", error);
    }
    for record in &view.records {
        print_record(record);
    }
    if let Some(info) = view.page_info {
        println!("page {} of {}", info.current, info.last);
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = ClientConfig::from_path(&cli.config)?;
    let client = InventoryClient::from_config(&config)?;

    let outcome = match cli.command {
        Command::List { resource, page } => {
            let view = client.mount(resource.into()).load(page).await?;
            print_view(&view);
            return Ok(());
        }
        Command::Create {
            resource,
            name,
            price,
        } => client.mount(resource.into()).create(name, price).await,
        Command::Update {
            resource,
            id,
            name,
            price,
        } => client.mount(resource.into()).update(id, name, price).await,
        Command::Delete { resource, id } => client.mount(resource.into()).delete(id).await,
    };

    match outcome {
        Ok(record) => {
            print_record(&record);
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {}", error_message(err.api_error()));
            Err(err.into())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stockpile_client=info,stockpile_cache=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}
