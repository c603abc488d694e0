// UI layer: terminal interaction around the pipeline. A password prompt
// with `dialoguer`, a spinner for a single subject and a progress bar for a
// batch with `indicatif`. Progress is drawn on stderr; result lines go to
// stdout.

use crate::api::{ApiClient, Transport};
use crate::config::StudySettings;
use crate::pipeline::{batch_line, process_batch, read_batch, resolve_subject};
use anyhow::{Context, Result};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Ask for the service password on the terminal. Input is hidden.
pub fn prompt_password(username: &str) -> Result<String> {
    let password = Password::new()
        .with_prompt(format!("Password for {username}"))
        .interact()
        .context("Failed to read password")?;
    Ok(password)
}

/// Resolve one subject and print its URL.
pub fn run_single<T: Transport>(api: &ApiClient<T>, study: &StudySettings, subject: &str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Resolving subject {subject}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = resolve_subject(api, study, subject);
    spinner.finish_and_clear();

    let url = result.with_context(|| format!("Could not generate URL for subject {subject}"))?;
    println!("{url}");
    Ok(())
}

/// Resolve every row of a CSV file, printing `<id>,<email>,<url>` per row.
/// Stops at the first failing row.
pub fn run_batch<T: Transport>(api: &ApiClient<T>, study: &StudySettings, path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = read_batch(file).with_context(|| format!("Failed to read {}", path.display()))?;

    let bar = ProgressBar::new(rows.len() as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = process_batch(api, study, &rows, |row, url| {
        bar.set_message(row.subject_id.clone());
        bar.suspend(|| writeln!(out, "{}", batch_line(row, url)))?;
        bar.inc(1);
        Ok(())
    });
    bar.finish_and_clear();

    let processed = result.with_context(|| format!("Batch {} stopped", path.display()))?;
    Ok(processed)
}
