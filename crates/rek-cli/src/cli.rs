use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rek_types::{ActionType, ComponentId, LocationId};

#[derive(Parser)]
#[command(
    name = "rek",
    about = "rek: stock ledger for an electronic-components warehouse",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML config file; `rek.toml` in the working directory is used if present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `data_dir` from the config.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the data directory, optionally with demo data
    Init(InitArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List stock rows
    Stock(StockArgs),
    /// Set the on-hand quantity of one row
    Adjust(AdjustArgs),
    /// Show audit entries, newest first
    Audit(AuditArgs),
    /// Check the audit chain and reconstruct stock from it
    Verify,
}

#[derive(Args)]
pub struct InitArgs {
    /// Load the demo catalog and book its opening stock
    #[arg(long)]
    pub seed: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct StockArgs {
    #[arg(long)]
    pub component: Option<ComponentId>,
    #[arg(long)]
    pub location: Option<LocationId>,
    #[arg(long)]
    pub below_min: bool,
}

#[derive(Args)]
pub struct AdjustArgs {
    #[arg(long)]
    pub component: ComponentId,
    #[arg(long)]
    pub location: LocationId,
    /// New absolute quantity
    #[arg(long, allow_hyphen_values = true)]
    pub quantity: i64,
    #[arg(long)]
    pub reason: Option<String>,
    #[arg(long, default_value = "operator")]
    pub user: String,
}

#[derive(Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub component: Option<ComponentId>,
    #[arg(long)]
    pub action: Option<ActionType>,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}
