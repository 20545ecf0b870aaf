//! CLI module for jilo-server
//!
//! Runs the monitor by default, or a one-shot check of every agent.

pub mod check;

use crate::db::schema::BootstrapMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jilo Server - periodic health monitor for Jilo agents
#[derive(Parser, Debug)]
#[command(name = "jilo-server")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    JILO_DATABASE_PATH          SQLite database path (overrides config)
    JILO_REQUEST_TIMEOUT_SECS   Per-request timeout in seconds (default: 30)
    JILO_LOG_LEVEL              Log filter (default: info,sqlx=warn)
"#)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Create the database table without prompting
    #[arg(long, global = true)]
    pub init_db: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// テーブル欠落時の挙動
    pub fn bootstrap_mode(&self) -> BootstrapMode {
        if self.init_db {
            BootstrapMode::AutoCreate
        } else {
            BootstrapMode::Prompt
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every agent once, record the results and exit
    Check(check::CheckArgs),
}
