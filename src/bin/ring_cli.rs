use std::path::PathBuf;

use anyhow::bail;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use ringroute::{
    cluster::partitioning::PartitioningScheme,
    config::Config,
    telemetry::{initialize_fmt_subscriber, initialize_json_subscriber},
    utils::serde_utf8_bytes,
};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "ringroute-cli")]
#[command(about = "Inspect a consistent hashing ring described by a json config", long_about = None)]
struct Cli {
    #[arg(long)]
    config_path: PathBuf,
    #[arg(short, long, default_value = "false")]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the owner of each key
    Lookup { keys: Vec<String> },
    /// Prints the nodes that are part of the ring
    Members,
    /// Prints every position of the ring and its owner
    Dump,
    /// Prints the owner of a key followed by the next distinct nodes clockwise
    PreferenceList {
        key: String,
        #[arg(short, default_value = "3")]
        n: usize,
    },
    /// Prints which keys change owners if a node is added or removed
    Relocations {
        #[arg(long)]
        add: Option<String>,
        #[arg(long)]
        remove: Option<String>,
        keys: Vec<String>,
    },
}

#[derive(Serialize)]
struct KeyOwner {
    key: String,
    position: u64,
    #[serde(with = "serde_utf8_bytes")]
    owner: Bytes,
}

#[derive(Serialize)]
struct RingEntry {
    position: u64,
    #[serde(with = "serde_utf8_bytes")]
    node: Bytes,
}

#[derive(Serialize)]
struct Relocation {
    key: String,
    #[serde(with = "serde_utf8_bytes")]
    from: Bytes,
    #[serde(with = "serde_utf8_bytes")]
    to: Bytes,
}

#[derive(Serialize)]
struct RelocationReport {
    moved: Vec<Relocation>,
    unchanged: usize,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    if args.json_logs {
        initialize_json_subscriber();
    } else {
        initialize_fmt_subscriber();
    }

    let config = Config::from_path(&args.config_path)?;

    match args.command {
        Commands::Lookup { keys } => {
            let ring = config.build_partitioning_scheme()?;
            let mut owners = Vec::with_capacity(keys.len());
            for key in keys {
                owners.push(KeyOwner {
                    position: ring.key_position(key.as_bytes()),
                    owner: ring.key_owner(key.as_bytes())?,
                    key,
                });
            }

            print_json(&owners)?;
        }
        Commands::Members => {
            let table = config.build_routing_table()?;
            let mut members: Vec<String> = table
                .members()?
                .iter()
                .map(|node| String::from_utf8_lossy(node).into_owned())
                .collect();
            members.sort();

            print_json(&members)?;
        }
        Commands::Dump => {
            let ring = config.build_partitioning_scheme()?;
            let entries: Vec<RingEntry> = ring
                .entries()
                .map(|(position, node)| RingEntry {
                    position,
                    node: node.clone(),
                })
                .collect();

            print_json(&entries)?;
        }
        Commands::PreferenceList { key, n } => {
            let table = config.build_routing_table()?;
            let nodes: Vec<String> = table
                .preference_list(key.as_bytes(), n)?
                .iter()
                .map(|node| String::from_utf8_lossy(node).into_owned())
                .collect();

            print_json(&nodes)?;
        }
        Commands::Relocations { add, remove, keys } => {
            let before = config.build_partitioning_scheme()?;
            let mut after = before.clone();
            match (add, remove) {
                (Some(node), None) => after.add_node(Bytes::from(node))?,
                (None, Some(node)) => after.remove_node(node.as_bytes())?,
                _ => bail!("exactly one of --add or --remove must be provided"),
            }

            let mut report = RelocationReport {
                moved: Vec::new(),
                unchanged: 0,
            };
            for key in keys {
                let from = before.key_owner(key.as_bytes())?;
                let to = after.key_owner(key.as_bytes())?;
                if from == to {
                    report.unchanged += 1;
                } else {
                    report.moved.push(Relocation { key, from, to });
                }
            }

            print_json(&report)?;
        }
    }

    Ok(())
}
