//! Configuration loading, validation, and env substitution.
//!
//! Config files: `convoy.toml`, `convoy.yaml`, or `convoy.json`,
//! searched in `./` then `~/.config/convoy/`.
//!
//! Supports `${ENV_VAR}` substitution in the raw file text, so tokens and
//! secrets can stay out of the file itself.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, data_dir, discover_and_load, load_config},
    schema::{
        AccountsConfig, ClassifierConfig, ConvoyConfig, DatabaseConfig, IngestConfig,
        ServerConfig, TelegramAccount, WhatsAppAccount,
    },
};
