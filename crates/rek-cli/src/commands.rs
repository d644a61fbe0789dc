use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use rek_ledger::{verify, Adjustment};
use rek_report::{AuditFilter, ReportBuilder, StockLine};
use rek_server::{AppState, RekServer, ServerConfig};
use serde::Serialize;

use crate::cli::*;

const DEFAULT_CONFIG: &str = "rek.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(config, args),
        Command::Serve(args) => cmd_serve(config, args),
        Command::Stock(args) => cmd_stock(&config, args, format),
        Command::Adjust(args) => cmd_adjust(&config, args, format),
        Command::Audit(args) => cmd_audit(&config, args, format),
        Command::Verify => cmd_verify(&config, format),
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            ServerConfig::load(Path::new(DEFAULT_CONFIG)).context("reading rek.toml")?
        }
        None => ServerConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

fn open(config: &ServerConfig) -> anyhow::Result<AppState> {
    AppState::open(config)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(mut config: ServerConfig, args: InitArgs) -> anyhow::Result<()> {
    config.seed_catalog = args.seed;
    let state = open(&config)?;
    println!(
        "{} Initialized rek data directory in {}",
        "✓".green().bold(),
        config.data_dir.display().to_string().bold()
    );
    println!(
        "  Components: {}  Locations: {}  Stock rows: {}",
        state.catalog.components(&Default::default()).len(),
        state.catalog.locations(true).len(),
        state.engine.stock().len()
    );
    Ok(())
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = RekServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_stock(config: &ServerConfig, args: StockArgs, format: OutputFormat) -> anyhow::Result<()> {
    let state = open(config)?;
    let lines: Vec<StockLine> = ReportBuilder::stock_summary(state.engine.as_ref(), args.below_min)
        .filter(|l| args.component.map_or(true, |c| l.component == c))
        .filter(|l| args.location.map_or(true, |loc| l.location == loc))
        .collect();
    if format == OutputFormat::Json {
        return print_json(&lines);
    }
    if lines.is_empty() {
        println!("No stock rows.");
        return Ok(());
    }
    println!("{:<10} {:<10} {:>10} {:>10}", "COMPONENT", "LOCATION", "ON HAND", "MINIMUM");
    for line in &lines {
        let on_hand = format!("{:>10}", line.on_hand);
        let on_hand = if line.is_below_minimum {
            on_hand.red().bold()
        } else {
            on_hand.normal()
        };
        println!(
            "{:<10} {:<10} {} {:>10}",
            line.component.to_string(),
            line.location.to_string(),
            on_hand,
            line.minimum_threshold
        );
    }
    Ok(())
}

fn cmd_adjust(config: &ServerConfig, args: AdjustArgs, format: OutputFormat) -> anyhow::Result<()> {
    let state = open(config)?;
    let (row, entry) = state.engine.adjust(Adjustment {
        component: args.component,
        location: args.location,
        new_quantity: args.quantity,
        reason: args.reason,
        performed_by: args.user,
    })?;
    if format == OutputFormat::Json {
        return print_json(&entry);
    }
    println!(
        "{} {} at {} is now {} ({:+})",
        "✓".green().bold(),
        row.component.to_string().cyan(),
        row.location.to_string().cyan(),
        row.on_hand.to_string().bold(),
        entry.quantity_delta
    );
    println!("  Audit entry: {}", entry.seq.to_string().yellow());
    Ok(())
}

fn cmd_audit(config: &ServerConfig, args: AuditArgs, format: OutputFormat) -> anyhow::Result<()> {
    let state = open(config)?;
    let entries = ReportBuilder::audit_log(
        state.engine.as_ref(),
        &AuditFilter {
            component: args.component,
            action: args.action,
            limit: Some(args.limit),
            ..Default::default()
        },
    )?;
    if format == OutputFormat::Json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }
    for entry in &entries {
        let location = entry
            .location
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{} {} {:<9} {} {} {:>+8} by {}",
            entry.seq.to_string().yellow(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.action.to_string(),
            entry.component.to_string().cyan(),
            location,
            entry.quantity_delta,
            entry.performed_by
        );
        if let Some(description) = &entry.description {
            println!("    {description}");
        }
    }
    Ok(())
}

fn cmd_verify(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let state = open(config)?;
    let report = verify(state.engine.as_ref());
    if format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        let mark = |ok: bool| if ok { "valid".green() } else { "BROKEN".red().bold() };
        println!("Audit entries: {}  Stock rows: {}", report.entry_count, report.rows_checked);
        println!("  Hash chain: {}", mark(report.chain_valid));
        println!("  Sequences: {}", mark(report.sequence_monotonic));
        println!("  Reconstruction: {}", mark(report.reconstructable));
        for violation in &report.violations {
            println!("  {} {}: {}", "✗".red(), violation.seq, violation.description);
        }
    }
    anyhow::ensure!(report.is_valid(), "ledger verification failed");
    println!("{} Ledger verified", "✓".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rek.toml");
        std::fs::write(&path, "data_dir = \"/srv/rek\"\nlock_timeout_ms = 500\n").unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.data_dir, Path::new("/srv/rek"));
        assert_eq!(config.lock_timeout_ms, 500);

        let config = load_config(Some(&path), Some(Path::new("/tmp/other"))).unwrap();
        assert_eq!(config.data_dir, Path::new("/tmp/other"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml")), None).is_err());
    }

    #[test]
    fn init_then_adjust_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        cmd_init(config.clone(), InitArgs { seed: true }).unwrap();
        cmd_adjust(
            &config,
            AdjustArgs {
                component: rek_types::ComponentId(1),
                location: rek_types::LocationId(1),
                quantity: 7,
                reason: Some("recount".into()),
                user: "tester".into(),
            },
            OutputFormat::Json,
        )
        .unwrap();
        cmd_verify(&config, OutputFormat::Json).unwrap();

        let state = open(&config).unwrap();
        let row = state
            .engine
            .stock()
            .get(rek_types::StockKey::new(rek_types::ComponentId(1), rek_types::LocationId(1)))
            .unwrap();
        assert_eq!(row.on_hand, 7);
    }
}
