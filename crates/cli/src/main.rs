//! moo-files
//!
//! Command-line file manager for the Moo Beef Steak Prime admin API.

mod render;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use fm_client::{
    default_config_path, Config, CredentialBackend, CredentialError, DirectorySink,
    FileManagerClient, HttpTransport, ManagerState, MemoryCredentials, Outcome, SystemKeychain,
    TokenStore, ViewMode, TOKEN_ENV,
};
use fm_protocol::UploadFile;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

type Client = FileManagerClient<HttpTransport<Box<dyn CredentialBackend>>>;

/// moo-files - manage files on the Moo admin API.
#[derive(Parser, Debug)]
#[command(name = "moo-files")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// API base URL (overrides the configuration)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List a remote directory
    Ls {
        /// Remote directory (defaults to the configured root)
        path: Option<String>,

        /// Listing layout
        #[arg(long, value_enum)]
        view: Option<ViewArg>,
    },

    /// Upload a local file
    Upload {
        /// Local file to upload
        file: PathBuf,

        /// Remote destination directory
        #[arg(long, value_name = "PATH")]
        to: Option<String>,
    },

    /// Delete files or folders
    Rm {
        /// Names of the entries to delete
        #[arg(required = true)]
        names: Vec<String>,

        /// Remote directory containing the entries
        #[arg(long, short)]
        path: Option<String>,
    },

    /// Create a folder
    Mkdir {
        /// Name of the new folder
        name: String,

        /// Remote directory to create the folder in
        #[arg(long, short)]
        path: Option<String>,
    },

    /// Rename a file or folder
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,

        /// Remote directory containing the entry
        #[arg(long, short)]
        path: Option<String>,
    },

    /// Move files or folders to another directory
    Mv {
        /// Names of the entries to move
        #[arg(required = true)]
        names: Vec<String>,

        /// Destination directory
        #[arg(long, short)]
        dest: String,

        /// Remote directory containing the entries
        #[arg(long, short)]
        path: Option<String>,
    },

    /// Copy files or folders to another directory
    Cp {
        /// Names of the entries to copy
        #[arg(required = true)]
        names: Vec<String>,

        /// Destination directory
        #[arg(long, short)]
        dest: String,

        /// Remote directory containing the entries
        #[arg(long, short)]
        path: Option<String>,
    },

    /// Download a file
    Download {
        /// Name of the file to download
        name: String,

        /// Remote directory containing the file
        #[arg(long, short)]
        path: Option<String>,

        /// Local directory to save into (defaults to the configured one)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Store the API token in the system keychain
    Login {
        /// Token to store (read from stdin when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the API token from the system keychain
    Logout,

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Listing layout argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewArg {
    Grid,
    List,
}

impl From<ViewArg> for ViewMode {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Grid => ViewMode::Grid,
            ViewArg::List => ViewMode::List,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_tracing(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Error: invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration file, then apply environment and flag overrides.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.apply_env_overrides();
    if let Some(url) = &cli.base_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

/// Initialize tracing. Logs go to stderr, or to `logging.file` when set.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    match &config.logging.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(directory).with_context(|| {
                format!("Failed to create log directory: {}", directory.display())
            })?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// Token store for API calls. A token in the environment takes precedence
/// over the keychain.
fn token_store(config: &Config) -> TokenStore<Box<dyn CredentialBackend>> {
    let service = config.credentials.service.as_str();
    let key_name = config.credentials.key_name.as_str();

    let backend: Box<dyn CredentialBackend> = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::debug!("Using API token from {}", TOKEN_ENV);
            Box::new(MemoryCredentials::with_secret(service, key_name, token.trim()))
        }
        _ => Box::new(SystemKeychain),
    };
    TokenStore::with_names(backend, service, key_name)
}

fn keychain_store(config: &Config) -> TokenStore<SystemKeychain> {
    TokenStore::with_names(
        SystemKeychain,
        config.credentials.service.as_str(),
        config.credentials.key_name.as_str(),
    )
}

fn build_client(config: &Config, path: Option<&str>) -> anyhow::Result<Client> {
    let base_url = config.base_url()?;
    let transport = HttpTransport::new(base_url, token_store(config), config.request_timeout())?;
    let root = path.unwrap_or(&config.manager.root_dir);
    Ok(FileManagerClient::with_root(
        transport,
        root,
        config.manager.view_mode,
    ))
}

/// Execute a command. Returns whether it succeeded.
async fn run(cli: Cli, config: Config) -> anyhow::Result<bool> {
    let json = cli.json;

    match cli.command {
        Commands::Ls { path, view } => {
            let client = build_client(&config, path.as_deref())?;
            if let Some(view) = view {
                client.set_view_mode(view.into()).await;
            }
            let outcome = client.load_files().await;
            let state = client.state().await;
            if json {
                print_json(&outcome, &state);
            } else if outcome.is_success() {
                print!("{}", render::listing(&state, state.view_mode()));
            } else {
                report_failure(&outcome);
            }
            Ok(outcome.is_success())
        }

        Commands::Upload { file, to } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("Not a file: {}", file.display()))?;

            let client = build_client(&config, None)?;
            let destination = to.as_deref().unwrap_or(&config.manager.root_dir);
            match client
                .upload_file(UploadFile::new(name.clone(), content), Some(destination))
                .await
            {
                Ok(outcome) => Ok(finish(&client, outcome, json, &format!("Uploaded {}", name)).await),
                Err(e) => {
                    let outcome = Outcome::Failed {
                        message: e.to_string(),
                    };
                    Ok(finish(&client, outcome, json, "").await)
                }
            }
        }

        Commands::Rm { names, path } => {
            let client = build_client(&config, path.as_deref())?;
            let outcome = client.delete_files(names.as_slice()).await;
            let done = format!("Deleted {} item(s)", names.len());
            Ok(finish(&client, outcome, json, &done).await)
        }

        Commands::Mkdir { name, path } => {
            let client = build_client(&config, path.as_deref())?;
            let outcome = client.create_folder(&name).await;
            Ok(finish(&client, outcome, json, &format!("Created folder {}", name)).await)
        }

        Commands::Rename { old, new, path } => {
            let client = build_client(&config, path.as_deref())?;
            let outcome = client.rename_file(&old, &new).await;
            Ok(finish(&client, outcome, json, &format!("Renamed {} to {}", old, new)).await)
        }

        Commands::Mv { names, dest, path } => {
            let client = build_client(&config, path.as_deref())?;
            let outcome = client.move_files(names.as_slice(), &dest).await;
            let done = format!("Moved {} item(s) to {}", names.len(), dest);
            Ok(finish(&client, outcome, json, &done).await)
        }

        Commands::Cp { names, dest, path } => {
            let client = build_client(&config, path.as_deref())?;
            let outcome = client.copy_files(names.as_slice(), &dest).await;
            let done = format!("Copied {} item(s) to {}", names.len(), dest);
            Ok(finish(&client, outcome, json, &done).await)
        }

        Commands::Download { name, path, out } => {
            let client = build_client(&config, path.as_deref())?;
            let listed = client.load_files().await;
            if !listed.is_success() {
                return Ok(finish(&client, listed, json, "").await);
            }

            let entry = client.state().await.entry(&name).cloned();
            let outcome = match entry {
                Some(entry) => {
                    let directory = out.unwrap_or_else(|| config.downloads.directory.clone());
                    let sink = DirectorySink::new(directory);
                    client.download_file(&entry, &sink).await
                }
                None => Outcome::Failed {
                    message: format!("no such file: {}", name),
                },
            };
            Ok(finish(&client, outcome, json, "").await)
        }

        Commands::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => read_token_from_stdin()?,
            };
            keychain_store(&config)
                .store_token(&token)
                .context("Failed to store API token")?;
            println!("API token stored in the system keychain");
            Ok(true)
        }

        Commands::Logout => match keychain_store(&config).clear_token() {
            Ok(()) => {
                println!("API token removed");
                Ok(true)
            }
            Err(CredentialError::NotFound(_)) => {
                println!("No API token stored");
                Ok(true)
            }
            Err(e) => Err(e).context("Failed to remove API token"),
        },

        Commands::Config(ConfigCommands::Show) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", config.to_toml()?);
            }
            Ok(true)
        }

        Commands::Config(ConfigCommands::Init { force }) => {
            let path = cli.config.unwrap_or_else(default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(true)
        }
    }
}

/// Print the result of a mutating command.
async fn finish(client: &Client, outcome: Outcome, json: bool, done: &str) -> bool {
    let state = client.state().await;
    if json {
        print_json(&outcome, &state);
        return outcome.is_success();
    }
    match &outcome {
        Outcome::Downloaded(path) => println!("Saved {}", path.display()),
        Outcome::Refreshed | Outcome::Dismissed => {
            if !done.is_empty() {
                println!("{}", done);
            }
        }
        _ => report_failure(&outcome),
    }
    outcome.is_success()
}

fn report_failure(outcome: &Outcome) {
    match outcome {
        Outcome::Failed { message } => eprintln!("Error: {}", message),
        Outcome::Notified(notification) => {
            eprintln!("{}: {}", notification.title, notification.description)
        }
        Outcome::Stale => eprintln!("Error: listing superseded by a newer request"),
        _ => {}
    }
}

fn print_json(outcome: &Outcome, state: &ManagerState) {
    let value = render::outcome_json(outcome, state);
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to encode JSON output: {}", e),
    }
}

fn read_token_from_stdin() -> anyhow::Result<String> {
    eprintln!("Paste API token and press Enter:");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read token from stdin")?;
    let token = line.trim().to_string();
    if token.is_empty() {
        anyhow::bail!("No token provided");
    }
    Ok(token)
}
