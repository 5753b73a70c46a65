use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing::{error, info, warn};
use validator::Validate;
use vault_backup::backup::manager::{BackupManager, BackupOutcome};
use vault_backup::backup::result_error::error::Error;
use vault_backup::backup::result_error::result::Result;
use vault_backup::backup::result_error::WithMsg;
use vault_backup::backup::retention::list_backups;
use vault_backup::backup::settings::AppConfig;

/// Create zip backups of a vault directory and prune old ones
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a backup now
    Run,
    /// List existing backups, newest first
    List,
    /// Keep running, creating backups on the configured cron schedule
    Watch,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{e}");
        exit(1);
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let config: AppConfig = File::open(path)
        .map_err(Error::from)
        .and_then(|f| serde_yml::from_reader(f).map_err(Error::from))
        .with_msg(format!("Loading config failed: {path:?}"))?;
    config
        .validate()
        .map_err(Error::from)
        .with_msg(format!("Config validation failed: {path:?}"))?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args.config)?;
    let manager = BackupManager::new();

    match args.command {
        Command::Run => match manager.execute(
            config.vault_dir(),
            &config.resolved_vault_name(),
            config.backup(),
        )? {
            BackupOutcome::Created(path) => println!("{}", path.display()),
            BackupOutcome::Skipped => println!("skipped"),
        },
        Command::List => {
            let records = list_backups(
                config.backup().backup_dir(),
                config.backup().filename_template(),
            )?;
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    record.created().format("%Y-%m-%d %H:%M:%S"),
                    record.size(),
                    record.filename()
                );
            }
        }
        Command::Watch => watch(&config, &manager)?,
    }

    Ok(())
}

fn watch(config: &AppConfig, manager: &BackupManager) -> Result<()> {
    let schedule = config.schedule().as_deref().ok_or(Error::ScheduleUnset)?;
    let vault_name = config.resolved_vault_name();

    if *config.run_on_start() {
        run_once(config, manager, &vault_name);
    }

    loop {
        let now = chrono::Local::now();
        let next = cron_parser::parse(schedule, &now)
            .map_err(|e| Error::InvalidCron(format!("{e:?}")))?;
        info!("Sleeping until {next}");
        std::thread::sleep((next - now).to_std().unwrap_or_default());
        run_once(config, manager, &vault_name);
    }
}

fn run_once(config: &AppConfig, manager: &BackupManager, vault_name: &str) {
    match manager.execute(config.vault_dir(), vault_name, config.backup()) {
        Ok(BackupOutcome::Created(path)) => info!("Backup created: {:?}", path),
        Ok(BackupOutcome::Skipped) => warn!("Backup skipped, previous run still active"),
        Err(e) => error!("Backup failed: {e}"),
    }
}
