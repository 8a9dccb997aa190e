//! # Moo File-Manager Client
//!
//! Client-side adapter for the remote file manager of the Moo Beef Steak
//! Prime admin API.
//!
//! ## Overview
//!
//! - **Manager**: [`FileManagerClient`] lists, uploads, deletes, renames,
//!   moves, copies and downloads remote files, folding every response into an
//!   [`Outcome`]
//! - **State**: [`ManagerState`] with a single reducer and a derived
//!   [`Phase`] (`Idle | Loading | Error | Notifying`)
//! - **Transport**: the [`Transport`] trait and its `reqwest` implementation
//!   [`HttpTransport`]
//! - **Credentials**: bearer token kept in the OS keychain ([`TokenStore`])
//! - **Sinks**: where downloaded files go ([`DirectorySink`], [`MemorySink`])
//! - **Config**: TOML configuration with environment overrides ([`Config`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fm_client::{FileManagerClient, HttpTransport, MemoryCredentials, TokenStore};
//! use url::Url;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tokens = TokenStore::new(MemoryCredentials::new());
//! tokens.store_token("secret-token")?;
//!
//! let base = Url::parse("https://admin.example.com/api")?;
//! let transport = HttpTransport::new(base, tokens, None)?;
//! let client = FileManagerClient::new(transport);
//!
//! client.navigate("/photos").await;
//! for entry in client.state().await.entries() {
//!     println!("{}", entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod manager;
pub mod notification;
pub mod sink;
pub mod state;
pub mod transport;

pub use config::{default_config_path, Config, ConfigError, TOKEN_ENV};
pub use credentials::{
    CredentialBackend, CredentialError, CredentialResult, MemoryCredentials, SystemKeychain,
    TokenStore,
};
pub use manager::{FileManagerClient, ManagerError, Outcome, DOWNLOAD_FAILED, NO_ITEMS_SELECTED};
pub use notification::{AcceptAction, Notification};
pub use sink::{DirectorySink, DownloadSink, MemorySink, SinkError};
pub use state::{Action, ListingTicket, ManagerState, Phase, Transition, ViewMode};
pub use transport::{HttpTransport, Transport, TransportFuture};
