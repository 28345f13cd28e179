// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! FingerBase CLI Tool
//!
//! Command-line interface for fingerprint index operations.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fingerbase::bfp::bfp_dummy;
use fingerbase::rdtree::RdTree;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fingerbase")]
#[command(author = "Vivian Voss <ask@vvoss.dev>")]
#[command(version = "0.1.0")]
#[command(about = "FingerBase CLI - binary fingerprint index operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new index
    Create {
        /// Index base path (produces <path>.nodes, <path>.meta, <path>.lock)
        path: PathBuf,

        /// Index declaration, e.g. "id, s bits(1024), OPT_FOR_SUBSET_QUERIES"
        #[arg(short, long, default_value = "id, s bits(1024)")]
        decl: String,
    },

    /// Insert a fingerprint
    Insert {
        /// Index base path
        path: PathBuf,

        /// Fingerprint as hex bytes (e.g. 0fa3...)
        #[arg(long, conflicts_with = "dummy")]
        hex: Option<String>,

        /// Constant-byte test fingerprint: NBITS,BYTE (e.g. 1024,15)
        #[arg(long)]
        dummy: Option<String>,

        /// Explicit rowid (allocated when omitted)
        #[arg(short, long)]
        rowid: Option<i64>,
    },

    /// Delete a row
    Delete {
        /// Index base path
        path: PathBuf,

        /// Rowid to delete
        rowid: i64,
    },

    /// Substructure screen: rows containing the query fingerprint
    SearchSubset {
        /// Index base path
        path: PathBuf,

        /// Query fingerprint as hex bytes
        #[arg(long, conflicts_with = "dummy")]
        hex: Option<String>,

        /// Constant-byte test query: NBITS,BYTE
        #[arg(long)]
        dummy: Option<String>,

        /// Print traversal metrics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Similarity query: rows with tanimoto >= threshold
    SearchTanimoto {
        /// Index base path
        path: PathBuf,

        /// Similarity threshold in (0, 1]
        #[arg(short, long)]
        threshold: f64,

        /// Query fingerprint as hex bytes
        #[arg(long, conflicts_with = "dummy")]
        hex: Option<String>,

        /// Constant-byte test query: NBITS,BYTE
        #[arg(long)]
        dummy: Option<String>,

        /// Print traversal metrics
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show index statistics
    Stats {
        /// Index base path
        path: PathBuf,

        /// Output format: table|json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Create { path, decl } => {
            let index = RdTree::create_file(&path, &decl)
                .with_context(|| format!("creating index at '{}'", path.display()))?;
            let stats = index.stats();
            println!(
                "created '{}': {} byte fingerprints, {} items/node, strategy {}",
                path.display(),
                stats.bfp_bytes,
                stats.node_capacity,
                stats.strategy
            );
        }

        Commands::Insert {
            path,
            hex,
            dummy,
            rowid,
        } => {
            let bfp = parse_bfp(hex.as_deref(), dummy.as_deref())?;
            let mut index = open(&path)?;
            let rowid = index.insert(rowid, &bfp)?;
            println!("inserted rowid {}", rowid);
        }

        Commands::Delete { path, rowid } => {
            let mut index = open(&path)?;
            index.delete(rowid)?;
            println!("deleted rowid {}", rowid);
        }

        Commands::SearchSubset {
            path,
            hex,
            dummy,
            verbose,
        } => {
            let query = parse_bfp(hex.as_deref(), dummy.as_deref())?;
            let mut index = open(&path)?;
            let blob = fingerbase::subset_query(&query);
            let (rows, metrics) = index.search_with_metrics(Some(&blob))?;
            print_rows(&rows);
            if verbose {
                eprintln!("{}", serde_json::to_string(&metrics)?);
            }
        }

        Commands::SearchTanimoto {
            path,
            threshold,
            hex,
            dummy,
            verbose,
        } => {
            if !(threshold > 0.0 && threshold <= 1.0) {
                bail!("threshold must be in (0, 1], got {}", threshold);
            }
            let query = parse_bfp(hex.as_deref(), dummy.as_deref())?;
            let mut index = open(&path)?;
            let blob = fingerbase::tanimoto_query(&query, threshold);
            let (rows, metrics) = index.search_with_metrics(Some(&blob))?;
            print_rows(&rows);
            if verbose {
                eprintln!("{}", serde_json::to_string(&metrics)?);
            }
        }

        Commands::Stats { path, format } => {
            let index = open(&path)?;
            let stats = index.stats();
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
                "table" => {
                    println!("rows:          {}", stats.rows);
                    println!("nodes:         {}", stats.nodes);
                    println!("depth:         {}", stats.depth);
                    println!("bfp bytes:     {}", stats.bfp_bytes);
                    println!("node size:     {}", stats.node_size);
                    println!("node capacity: {}", stats.node_capacity);
                    println!("min fill:      {}", stats.min_fill);
                    println!("strategy:      {}", stats.strategy);
                }
                other => bail!("unknown format '{}', expected table|json", other),
            }
        }
    }

    Ok(())
}

fn open(path: &Path) -> anyhow::Result<RdTree<fingerbase::FileStorage>> {
    RdTree::open_file(path).with_context(|| format!("opening index at '{}'", path.display()))
}

/// Decode the fingerprint argument: `--hex` bytes or a `--dummy` spec.
fn parse_bfp(hex: Option<&str>, dummy: Option<&str>) -> anyhow::Result<Vec<u8>> {
    match (hex, dummy) {
        (Some(hex), None) => {
            let hex = hex.trim();
            if !hex.is_ascii() || hex.len() % 2 != 0 {
                bail!("hex fingerprint must be an even number of hex digits");
            }
            (0..hex.len())
                .step_by(2)
                .map(|i| {
                    u8::from_str_radix(&hex[i..i + 2], 16)
                        .with_context(|| format!("invalid hex byte '{}'", &hex[i..i + 2]))
                })
                .collect()
        }
        (None, Some(spec)) => {
            let (nbits, byte) = spec
                .split_once(',')
                .context("dummy spec must be NBITS,BYTE")?;
            let nbits: i64 = nbits.trim().parse().context("invalid NBITS")?;
            let byte: i64 = byte.trim().parse().context("invalid BYTE")?;
            Ok(bfp_dummy(nbits, byte))
        }
        _ => bail!("exactly one of --hex or --dummy is required"),
    }
}

fn print_rows(rows: &[i64]) {
    for rowid in rows {
        println!("{}", rowid);
    }
    eprintln!("{} row(s)", rows.len());
}
