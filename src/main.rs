use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use boat_chaincode::{dispatch, BoatContract, Operation, WorldState};

mod config;

use config::HostConfig;

//==================== CLI ====================//

/// Runs boat chaincode operations against a local world-state file.
#[derive(Parser, Debug)]
#[command(name = "boat-chaincode", version, about)]
struct Cli {
    #[command(flatten)]
    config: HostConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed BOAT0..BOAT9 with the sample boats
    InitLedger,
    /// Write a boat under KEY, replacing whatever was there
    CreateBoat {
        key: String,
        make: String,
        model: String,
        colour: String,
        owner: String,
    },
    /// Print one boat
    QueryBoat { key: String },
    /// Print every boat in [BOAT0, BOAT999)
    QueryAllBoats,
    /// Call an operation by its chaincode name, e.g. `invoke QueryBoat BOAT3`
    Invoke {
        function: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the Merkle root of the world state
    StateRoot,
}

impl Command {
    /// Chaincode function name and arguments; `None` for host-only commands.
    fn into_invocation(self) -> Option<(String, Vec<String>)> {
        let call = match self {
            Command::InitLedger => (Operation::InitLedger.name().to_string(), vec![]),
            Command::CreateBoat {
                key,
                make,
                model,
                colour,
                owner,
            } => (
                Operation::CreateBoat.name().to_string(),
                vec![key, make, model, colour, owner],
            ),
            Command::QueryBoat { key } => (Operation::QueryBoat.name().to_string(), vec![key]),
            Command::QueryAllBoats => (Operation::QueryAllBoats.name().to_string(), vec![]),
            Command::Invoke { function, args } => (function, args),
            Command::StateRoot => return None,
        };
        Some(call)
    }
}

//==================== run ====================//

/// Executes one command. Returns the JSON to print, if any.
fn run(cli: Cli) -> Result<Option<Value>> {
    let path = cli.config.state;
    let mut state = WorldState::load(&path)
        .with_context(|| format!("loading world state from {}", path.display()))?;

    let Some((function, args)) = cli.command.into_invocation() else {
        return Ok(Some(json!({
            "root": hex::encode(state.state_root()),
            "entries": state.len(),
        })));
    };

    let op: Operation = function.parse()?;
    let result = dispatch::invoke(&BoatContract::new(), &mut state, op.name(), &args)
        .with_context(|| format!("{op} failed"))?;

    if !op.is_write() {
        return Ok(Some(result));
    }
    state
        .save(&path)
        .with_context(|| format!("saving world state to {}", path.display()))?;
    info!(
        function = op.name(),
        entries = state.len(),
        path = %path.display(),
        "world state updated"
    );
    Ok(None)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.config.init_tracing();
    if let Some(output) = run(cli)? {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn cli(state: &Path, args: &[&str]) -> Cli {
        let state = state.to_str().unwrap();
        let mut argv = vec!["boat-chaincode", "--state", state];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn seed_then_query_through_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        assert!(run(cli(&path, &["init-ledger"])).unwrap().is_none());
        assert!(path.exists());

        let boat = run(cli(&path, &["query-boat", "BOAT9"])).unwrap().unwrap();
        assert_eq!(
            boat,
            json!({"make": "Holden", "model": "Barina", "colour": "brown", "owner": "Shotaro"})
        );

        let all = run(cli(&path, &["query-all-boats"])).unwrap().unwrap();
        assert_eq!(all.as_array().unwrap().len(), 10);
    }

    #[test]
    fn invoke_routes_by_chaincode_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        run(cli(
            &path,
            &["invoke", "CreateBoat", "BOAT42", "Honda", "Civic", "silver", "Ana"],
        ))
        .unwrap();
        let boat = run(cli(&path, &["invoke", "QueryBoat", "BOAT42"]))
            .unwrap()
            .unwrap();
        assert_eq!(boat["owner"], "Ana");
    }

    #[test]
    fn failed_query_does_not_create_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        let err = run(cli(&path, &["query-boat", "MISSING"])).unwrap_err();
        assert!(format!("{err:#}").contains("boat does not exist: MISSING"));
        assert!(!path.exists());
    }

    #[test]
    fn unknown_function_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        assert!(run(cli(&path, &["invoke", "DeleteBoat", "BOAT0"])).is_err());
    }

    #[test]
    fn state_root_reflects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        let empty = run(cli(&path, &["state-root"])).unwrap().unwrap();
        assert_eq!(empty["entries"], 0);

        run(cli(&path, &["init-ledger"])).unwrap();
        let seeded = run(cli(&path, &["state-root"])).unwrap().unwrap();
        assert_eq!(seeded["entries"], 10);
        assert_ne!(seeded["root"], empty["root"]);
    }

    #[test]
    fn create_boat_requires_all_fields() {
        let argv = ["boat-chaincode", "create-boat", "BOAT1", "Honda"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
