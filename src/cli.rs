// Command-line arguments.

use crate::config::Settings;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "camcog",
    version,
    about = "Generate CANTAB questionnaire URLs for study subjects",
    long_about = "Looks up (or registers) a subject with the CANTAB web service, fetches its \
                  access code and prints the URL that takes the subject into the questionnaire.\n\n\
                  Settings are read from config.yml in /etc/camcog, ~/.camcog or the current \
                  directory, overridden by CAMCOG_* environment variables and then by flags."
)]
pub struct Cli {
    /// Config file to use instead of searching the default locations.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Password for the remote service (overrides config and environment).
    #[arg(long)]
    pub password: Option<String>,

    /// Local subject identifier to generate a URL for.
    #[arg(long, value_name = "ID", conflicts_with = "csv")]
    pub subject: Option<String>,

    /// CSV file with a subject identifier and an email address per row.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Whether a subject or batch was requested.
    pub fn has_action(&self) -> bool {
        self.subject.is_some() || self.csv.is_some()
    }

    /// Configuration layer contributed by flags.
    pub fn overrides(&self) -> Settings {
        Settings {
            password: self.password.clone(),
            ..Default::default()
        }
    }
}
