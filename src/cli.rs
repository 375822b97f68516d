use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "control panel for a named system service")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Service name (overrides the config file)
    #[arg(long, short = 's', global = true)]
    pub service: Option<String>,

    /// Sub-commands (watch is the default)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Report current status (Exit 0 = running, 1 = otherwise)
    Status,
    /// Poll the service and print a status line each refresh
    Watch {
        /// Refresh interval in milliseconds
        #[arg(long, default_value_t = 1200)]
        interval_ms: u64,

        /// Ignore auto_start from the config file
        #[arg(long)]
        no_auto_start: bool,
    },
    /// Start the service and wait until it is running
    Start {
        /// Seconds to wait for the running state
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Stop the service and wait until it is stopped
    Stop {
        /// Seconds to wait for the stopped state
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Stop then start the service (each leg gets the full timeout)
    Restart {
        /// Seconds to wait per leg
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
