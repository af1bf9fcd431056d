use clap::{Parser, Subcommand};
use gatepass::config::{self, Config};
use gatepass::credential::Attendee;
use gatepass::imaging::QrBackend;
use gatepass::issue::{self, IssueConfig, IssueError};
use gatepass::registry::ScanRegistry;
use gatepass::scan::{self, ImageFileSource, StopSignal};
use gatepass::output;
use gatepass::validate::ValidationEngine;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatepass")]
#[command(about = "Issue QR entry credentials and admit each one exactly once")]
#[command(long_about = "\
Issue QR entry credentials and admit each one exactly once

Issuing turns attendee details into a QR image under the artifacts
directory. Scanning reads codes from frames and checks each payload against
the registry of admitted credentials: the first presentation is VALID and
gets recorded, every later one is ALREADY SCANNED.

Files:

  gatepass.toml          # Optional config (see 'gatepass gen-config')
  scan-registry.txt      # Admitted payloads, one per line, append-only
  assets/                # Generated credentials: <name>_qr_code.png

Run 'gatepass gen-config' to print a documented gatepass.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing gatepass.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Registry file (overrides storage.registry)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Artifacts directory (overrides storage.artifacts_dir)
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Issue one credential
    Generate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
    },
    /// Issue credentials for every attendee in a TOML roster
    IssueBatch {
        /// Roster file with [[attendee]] tables
        roster: PathBuf,
    },
    /// Scan image frames and admit the credentials found in them
    Scan {
        /// Image files or directories of images, read in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Validate a single payload given as text
    Check { payload: String },
    /// List admitted payloads
    List {
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print a stock gatepass.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // gen-config must work even when the existing config file is broken.
    let load = || -> Result<Config, config::ConfigError> {
        let mut config = config::load_config(&cli.config_dir)?;
        if let Some(registry) = &cli.registry {
            config.storage.registry = registry.clone();
        }
        if let Some(dir) = &cli.artifacts_dir {
            config.storage.artifacts_dir = dir.clone();
        }
        Ok(config)
    };

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Generate { name, id, email } => {
            let config = load()?;
            let attendee = Attendee::new(name.as_str(), id.as_str(), email.as_str());
            match issue::issue(&attendee, &IssueConfig::from_config(&config)) {
                Ok(issued) => output::print_issued(&issued),
                Err(IssueError::Credential(e)) => {
                    eprintln!("Not issued: {e}. All of --name, --id and --email are required.");
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::IssueBatch { roster } => {
            let config = load()?;
            let attendees = issue::load_roster(roster)?;
            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_issue_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report =
                issue::issue_batch(&attendees, &IssueConfig::from_config(&config), Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_batch_summary(&report);
            if !report.failures.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Scan { inputs } => {
            let config = load()?;
            let engine = open_engine(&config)?;
            let source = ImageFileSource::open(inputs)?;
            let stop = StopSignal::new();
            if std::io::stdin().is_terminal() {
                println!("Scanning {} frames. Type q + Enter to stop.", source.remaining());
                spawn_quit_watcher(stop.clone());
            }
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_scan_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = scan::run_session(source, &QrBackend::new(), engine, &stop, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_scan_summary(&result?);
        }
        Command::Check { payload } => {
            let engine = open_engine(&load()?)?;
            let verdict = engine.validate(payload);
            let closed = engine.close();
            for line in output::format_check(payload, verdict?) {
                println!("{}", line);
            }
            closed?;
        }
        Command::List { json } => {
            let registry = ScanRegistry::open(&load()?.storage.registry)?;
            let entries = registry.entries();
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for line in output::format_registry(registry.path(), &entries) {
                    println!("{}", line);
                }
            }
        }
    }

    Ok(())
}

fn open_engine(config: &Config) -> Result<ValidationEngine, Box<dyn std::error::Error>> {
    let registry = ScanRegistry::open(&config.storage.registry)?;
    Ok(ValidationEngine::new(registry))
}

/// Initialize the rayon thread pool based on processing config.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Raise `stop` when the operator types `q` on the terminal.
fn spawn_quit_watcher(stop: StopSignal) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(l) if l.trim().eq_ignore_ascii_case("q") => {
                    stop.stop();
                    return;
                }
                Ok(_) => {}
                Err(_) => return,
            }
        }
    });
}
