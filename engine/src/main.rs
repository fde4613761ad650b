//! Decision-tree behavior engine CLI.
//!
//! Loads a graph description (JSON), builds the tree, and either checks it,
//! prints its display metadata, or drives an agent through a number of think
//! ticks against a blackboard seeded from the command line.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::agent::{Agent, ThinkOutcome};
use engine::blackboard::Blackboard;
use engine::core::path::node_path;
use engine::core::registry::NodeRegistry;
use engine::core::scheduler::ManualClock;
use engine::core::types::{NodeId, Value};
use engine::exit_codes;
use engine::io::clock::SystemClock;
use engine::io::config::{EngineConfig, load_config};
use engine::io::graph_store::load_tree;
use engine::logging;
use engine::tree::Tree;

#[derive(Parser)]
#[command(
    name = "engine",
    version,
    about = "Decision-tree behavior engine for autonomous agents"
)]
struct Cli {
    /// Raise log verbosity on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a graph file and check it against the schema and tree invariants.
    Validate {
        /// Graph description (JSON).
        graph: PathBuf,
    },
    /// Print the title and description of every reachable node.
    Describe {
        /// Graph description (JSON).
        graph: PathBuf,
    },
    /// Drive one agent through a number of think ticks.
    Run {
        /// Graph description (JSON).
        graph: PathBuf,

        /// Number of ticks (defaults to `think.max_ticks`).
        #[arg(long)]
        ticks: Option<u64>,

        /// Seed a blackboard entry, e.g. `--set hungry=true`.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,

        /// Engine config (TOML). Defaults apply when omitted or missing.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Sleep between ticks and use the wall clock for pending expiry.
        #[arg(long)]
        realtime: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Validate { graph } => cmd_validate(&graph),
        Command::Describe { graph } => cmd_describe(&graph),
        Command::Run {
            graph,
            ticks,
            set,
            config,
            realtime,
        } => cmd_run(&graph, ticks, set, config.as_deref(), realtime),
    }
}

fn cmd_validate(graph: &Path) -> Result<i32> {
    let tree = load_tree(graph, &NodeRegistry::with_builtins())?;
    let reachable = tree.reachable().context("walk tree")?;
    println!(
        "ok: {} ({} nodes, {} reachable)",
        tree.name(),
        tree.len(),
        reachable.len()
    );
    Ok(exit_codes::OK)
}

fn cmd_describe(graph: &Path) -> Result<i32> {
    let tree = load_tree(graph, &NodeRegistry::with_builtins())?;
    for id in tree.reachable().context("walk tree")? {
        let path = node_path(&tree, id).unwrap_or_else(|| "?".to_string());
        let title = tree.title(id)?;
        match tree.describe(id) {
            Ok(description) => println!("{path}\t{title}\t{description}"),
            Err(err) => println!("{path}\t{title}\t<{err}>"),
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_run(
    graph: &Path,
    ticks: Option<u64>,
    set: Vec<(String, Value)>,
    config: Option<&Path>,
    realtime: bool,
) -> Result<i32> {
    let cfg = match config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    let template = load_tree(graph, &NodeRegistry::with_builtins())?;
    let blackboard: Blackboard = set.into_iter().collect();
    let ticks = ticks.unwrap_or(cfg.think.max_ticks);
    let interval = cfg.think_interval()?;
    let name = format!("{}-agent", template.name());

    if realtime {
        let mut agent = Agent::new(
            &template,
            &name,
            blackboard.clone(),
            cfg.scheduler_config(),
            SystemClock::new(),
        )?;
        drive(&mut agent, ticks, || thread::sleep(interval))
    } else {
        let clock = ManualClock::new();
        let mut agent = Agent::new(
            &template,
            &name,
            blackboard.clone(),
            cfg.scheduler_config(),
            clock.clone(),
        )?;
        drive(&mut agent, ticks, || clock.advance(interval.as_secs_f64()))
    }
}

/// Think `ticks` times, calling `between` after each tick.
fn drive(agent: &mut Agent, ticks: u64, mut between: impl FnMut()) -> Result<i32> {
    let mut faulted = false;
    for tick in 1..=ticks {
        let outcome = match agent.think() {
            Ok(outcome) => outcome,
            Err(err) => {
                eprintln!("tick {tick}: {err}");
                return Ok(exit_codes::EVALUATION_FAILED);
            }
        };
        print_tick(agent.tree(), tick, &outcome)?;
        for fault in &outcome.faults {
            eprintln!("  {fault}");
            faulted = true;
        }
        between();
    }
    let interrupted = agent.shutdown();
    if !interrupted.is_empty() {
        println!("shutdown: {}", titles(agent.tree(), &interrupted)?);
    }
    let entries: Vec<String> = agent
        .blackboard()
        .snapshot()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    println!("blackboard: {}", entries.join(", "));
    Ok(if faulted {
        exit_codes::ACTION_FAULTED
    } else {
        exit_codes::OK
    })
}

fn print_tick(tree: &Tree, tick: u64, outcome: &ThinkOutcome) -> Result<()> {
    let selected = tree.title(outcome.selected)?;
    if outcome.scheduled {
        println!("tick {tick}: {selected}");
    } else {
        println!("tick {tick}: {selected} (already scheduled)");
    }
    if !outcome.interrupted.is_empty() {
        println!("  interrupted: {}", titles(tree, &outcome.interrupted)?);
    }
    if !outcome.finished.is_empty() {
        println!("  finished: {}", titles(tree, &outcome.finished)?);
    }
    Ok(())
}

fn titles(tree: &Tree, ids: &[NodeId]) -> Result<String> {
    let titles = ids
        .iter()
        .map(|id| tree.title(*id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(titles.join(", "))
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), Value::from_literal(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_validate() {
        let cli = Cli::parse_from(["engine", "validate", "graph.json"]);
        assert!(matches!(cli.command, Command::Validate { graph } if graph == Path::new("graph.json")));
    }

    #[test]
    fn parse_run_with_assignments() {
        let cli = Cli::parse_from([
            "engine",
            "run",
            "graph.json",
            "--ticks",
            "3",
            "--set",
            "hungry=true",
            "--set",
            "energy=0.5",
        ]);
        match cli.command {
            Command::Run {
                ticks,
                set,
                config,
                realtime,
                ..
            } => {
                assert_eq!(ticks, Some(3));
                assert_eq!(
                    set,
                    vec![
                        ("hungry".to_string(), Value::Bool(true)),
                        ("energy".to_string(), Value::Number(0.5)),
                    ]
                );
                assert!(config.is_none());
                assert!(!realtime);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn verbose_flag_counts_after_subcommand() {
        let cli = Cli::parse_from(["engine", "-v", "describe", "graph.json", "-v"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(Cli::parse_from(["engine", "validate", "g.json"]).verbose, 0);
    }

    #[test]
    fn assignment_requires_key_and_equals() {
        assert!(parse_assignment("hungry").is_err());
        assert!(parse_assignment("=true").is_err());
        assert_eq!(
            parse_assignment("mood=calm"),
            Ok(("mood".to_string(), Value::Text("calm".to_string())))
        );
    }

    #[test]
    fn run_rejects_bad_assignment() {
        assert!(Cli::try_parse_from(["engine", "run", "g.json", "--set", "oops"]).is_err());
    }
}
