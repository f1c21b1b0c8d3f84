//! Command-line arguments
//!
//! Every option can also be given through its `FACERATE_*` environment
//! variable; anything left unset falls through to the config file and then
//! to compiled defaults (see `facerate_common::config`).

use clap::Parser;
use facerate_common::config::Overrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "facerate-ui")]
#[command(about = "Web form for rating a folder of face images")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, env = "FACERATE_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// Folder containing the images to rate
    #[arg(short, long, env = "FACERATE_IMAGE_FOLDER")]
    pub image_folder: Option<PathBuf>,

    /// Rating store connection string (`sqlite://path.db`, or `memory`)
    #[arg(short, long, env = "FACERATE_STORE_URL")]
    pub store_url: Option<String>,

    /// Shared password required for login and registration
    #[arg(long, env = "FACERATE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Minutes of inactivity after which a visitor's session is dropped
    #[arg(long, env = "FACERATE_SESSION_IDLE_MINUTES")]
    pub session_idle_minutes: Option<u64>,

    /// Halt instead of falling back to in-memory storage when the store is unreachable
    #[arg(long, env = "FACERATE_NO_MEMORY_FALLBACK")]
    pub no_memory_fallback: bool,

    /// Config file (default: <config dir>/facerate/config.toml)
    #[arg(short, long, env = "FACERATE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            bind_addr: self.bind_addr.clone(),
            image_folder: self.image_folder.clone(),
            store_url: self.store_url.clone(),
            shared_password: self.password.clone(),
            session_idle_minutes: self.session_idle_minutes,
            // Unset flag leaves the decision to the config file
            allow_memory_fallback: self.no_memory_fallback.then_some(false),
        }
    }
}
