//! `emailbot history` — show sidecar records for one message or a directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use emailbot_core::{sidecar, Record};
use emailbot_process::discover;

/// Arguments for `emailbot history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// A message file, or a messages directory to list every message in.
    pub path: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ItemHistoryJson {
    item: String,
    records: Vec<Record>,
}

#[derive(Tabled)]
struct HistoryTableRow {
    #[tabled(rename = "message")]
    item: String,
    #[tabled(rename = "time")]
    time: String,
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "data")]
    data: String,
}

impl HistoryArgs {
    pub fn run(self) -> Result<()> {
        let items = if self.path.is_dir() {
            discover(&self.path)
                .with_context(|| format!("failed to list {}", self.path.display()))?
        } else if self.path.is_file() {
            vec![self.path.clone()]
        } else {
            bail!("no such message or directory: {}", self.path.display());
        };

        let mut histories = Vec::with_capacity(items.len());
        for item in items {
            let data = sidecar::load(&item)
                .with_context(|| format!("failed to read history of {}", item.display()))?;
            histories.push(ItemHistoryJson {
                item: item.display().to_string(),
                records: data.records,
            });
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&histories)
                    .context("failed to serialize history JSON")?
            );
            return Ok(());
        }

        print_table(&self.path, histories);
        Ok(())
    }
}

fn print_table(path: &Path, histories: Vec<ItemHistoryJson>) {
    if histories.is_empty() {
        println!("No messages in {}.", path.display());
        return;
    }

    let rows: Vec<HistoryTableRow> = histories
        .into_iter()
        .flat_map(|h| {
            let item = h.item;
            if h.records.is_empty() {
                return vec![HistoryTableRow {
                    item,
                    time: "-".to_string(),
                    key: "-".to_string(),
                    data: String::new(),
                }];
            }
            h.records
                .into_iter()
                .map(|r| HistoryTableRow {
                    item: item.clone(),
                    time: r.time.to_rfc3339(),
                    key: r.key,
                    data: r.data.unwrap_or_default(),
                })
                .collect()
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
