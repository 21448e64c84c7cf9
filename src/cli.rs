//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use tracker_session::SettingsOverrides;

/// Keep an authenticated tracker session alive.
///
/// Restores the saved session, checks that the tracker still accepts it and
/// walks through the interactive login (captcha, optional 2FA) when it does not.
#[derive(Parser, Debug)]
#[command(name = "tracker-session")]
#[command(author, version, about)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Directory holding config.toml, session.json and history.json
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Tracker base URL (default https://gazellegames.net)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds (1-3600)
    #[arg(short = 't', long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Pause after the post-login fetch in seconds (0-600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=600))]
    pub browse_pause: Option<u64>,

    /// Skip the post-login fetch
    #[arg(long)]
    pub no_browse: bool,
}

impl Args {
    /// Command-line values that override the config file.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            data_dir: self.data_dir.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout,
            browse_pause_secs: self.browse_pause,
            skip_browse: self.no_browse,
        }
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
