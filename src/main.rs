// Entrypoint for the CLI.
// - Parses flags and loads layered configuration into an explicit value.
// - Only this function decides the exit status: 0 on success, 1 when no
//   subject or CSV was given, non-zero with a message on any error.

use camcog_url::{cli::Cli, config::Settings, logging, ui, ApiClient};
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if !cli.has_action() {
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let mut settings = Settings::load(cli.config.as_deref(), cli.overrides())?;
    if settings.password.is_none() && std::io::stdin().is_terminal() {
        let username = settings.require_username()?.to_string();
        settings.password = Some(ui::prompt_password(&username)?);
    }
    let config = settings.resolve()?;

    let api = ApiClient::new(config.service)?;

    if let Some(subject) = &cli.subject {
        ui::run_single(&api, &config.study, subject)?;
    } else if let Some(path) = &cli.csv {
        ui::run_batch(&api, &config.study, path)?;
    }
    Ok(())
}
