// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing and command dispatch.

use crate::commands;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SQLite cache database file
    #[arg(short, long, default_value = "activity-stats.db", global = true)]
    database: Utf8PathBuf,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Serve the dashboard API over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8065")]
        addr: SocketAddr,
    },

    /// Aggregate commit stats once and print them
    Stats {
        /// First ISO week of the range (e.g. 2026-W01)
        #[arg(long)]
        week_start: Option<String>,

        /// Last ISO week of the range (e.g. 2026-W05)
        #[arg(long)]
        week_end: Option<String>,
    },
}

/// Parse arguments and dispatch to the appropriate command.
pub async fn dispatch() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Serve { addr } => {
            commands::run_serve(&args.database, &args.config, addr).await?;
        }
        Command::Stats {
            week_start,
            week_end,
        } => {
            commands::run_stats(&args.database, &args.config, week_start, week_end).await?;
        }
    }

    Ok(())
}
