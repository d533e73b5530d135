//! `emailbot run` — sync the mailbox, then process new and all messages.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory};
use colored::Colorize;

use emailbot_core::{config, Config, ConfigError, ConfigOverrides, Record, SidecarData};
use emailbot_process::{
    process, BoxError, CredentialChain, Driver, EnvPassword, ItemOutcome, ProcessError,
    ProcessSummary, Processor, SpoolSource,
};

/// Arguments for `emailbot run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML config file (default: ~/.emailbot/config.yaml if present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sync from this source. For the bundled spool source, the spool directory.
    #[arg(long)]
    pub server: Option<String>,

    /// Username for logging into the mail server.
    #[arg(long)]
    pub username: Option<String>,

    /// Mailbox to read messages from (typically INBOX or INBOX/subfolder).
    #[arg(long)]
    pub mailbox: Option<String>,

    /// Local directory to save messages in [default: messages].
    #[arg(long, value_name = "DIR")]
    pub messages_dir: Option<PathBuf>,

    /// Key of the record appended to each newly synced message.
    #[arg(long, value_name = "KEY", default_value = "synced")]
    pub new_key: String,

    /// Skip the new-message phase.
    #[arg(long)]
    pub no_new: bool,

    /// Print every message with its recorded history after syncing.
    #[arg(long)]
    pub print_all: bool,

    /// Never ask for a password on the terminal; only read $IMAP_PASSWORD.
    #[arg(long)]
    pub no_prompt: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        if let Err(ConfigError::Missing(field)) = config.validate() {
            print_usage();
            bail!("required parameter not found: --{field}");
        }

        let credentials = if self.no_prompt {
            CredentialChain::new().with(EnvPassword::default())
        } else {
            CredentialChain::interactive()
        };

        let new_key = self.new_key.clone();
        let mut record_new =
            move |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                Ok(Some(Record::new(new_key.clone())))
            };
        let mut print_details =
            |item: &Path, history: &SidecarData| -> Result<Option<Record>, BoxError> {
                print_history(item, history);
                Ok(None)
            };

        let summary = process(
            &config,
            &SpoolSource,
            &credentials,
            &Driver::default(),
            (!self.no_new).then_some(&mut record_new as &mut dyn Processor),
            self.print_all.then_some(&mut print_details as &mut dyn Processor),
        )
        .map_err(explain)?;

        print_summary(&config, &summary);
        Ok(())
    }

    fn resolve_config(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => {
                if !path.exists() {
                    bail!("config file not found: {}", path.display());
                }
                config::load_at(path)
            }
            None => config::load(),
        }
        .context("failed to load configuration")?;

        Ok(file.merge(ConfigOverrides {
            server: self.server.clone(),
            username: self.username.clone(),
            mailbox: self.mailbox.clone(),
            messages_dir: self.messages_dir.clone(),
        }))
    }
}

fn print_usage() {
    eprintln!("This program copies emails from a mailbox to your computer. Usage:");
    let mut cmd = crate::Cli::command();
    if let Some(run) = cmd.find_subcommand_mut("run") {
        eprintln!("{}", run.render_help());
    }
}

fn explain(err: ProcessError) -> anyhow::Error {
    let hint = match &err {
        ProcessError::Concurrency { .. } => Some("another emailbot run may still be active"),
        ProcessError::Sidecar { .. } => Some("fix or remove the sidecar file, then rerun"),
        _ => None,
    };
    let err = anyhow::Error::new(err);
    match hint {
        Some(hint) => err.context(hint),
        None => err,
    }
}

fn print_history(item: &Path, history: &SidecarData) {
    println!("{} {}", "▸".cyan(), item.display());
    if history.is_empty() {
        println!("    {}", "no records".bright_black());
    }
    for record in &history.records {
        match &record.data {
            Some(data) => println!("    {}  {}  {data}", record.time.to_rfc3339(), record.key),
            None => println!("    {}  {}", record.time.to_rfc3339(), record.key),
        }
    }
}

fn print_summary(config: &Config, summary: &ProcessSummary) {
    println!(
        "{} synced {} new, {} existing message(s) into {}",
        "✓".green(),
        summary.synced_new,
        summary.synced_existing,
        config.messages_dir.display()
    );
    for outcome in summary.new.iter().chain(summary.all.iter()) {
        if let ItemOutcome::Recorded { item, key } = outcome {
            println!("  ✎  {} ({key})", item.display());
        }
    }
}
