//! Name-based routing of host invocations onto [`BoatContract`].
//!
//! The host hands over a function name and positional string arguments, the
//! way a peer delivers a transaction proposal. Results come back as JSON:
//! `null` for writes, the boat or the listing for queries.

use std::{fmt, str::FromStr};

use serde_json::Value;
use tracing::debug;

use crate::{
    contracts::{BoatContract, ContractError},
    ledger::ChaincodeStub,
};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("{function} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        function: Operation,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("failed to encode result: {0}")]
    Result(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    InitLedger,
    CreateBoat,
    QueryBoat,
    QueryAllBoats,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::InitLedger,
        Operation::CreateBoat,
        Operation::QueryBoat,
        Operation::QueryAllBoats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::InitLedger => "InitLedger",
            Operation::CreateBoat => "CreateBoat",
            Operation::QueryBoat => "QueryBoat",
            Operation::QueryAllBoats => "QueryAllBoats",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operation::InitLedger | Operation::QueryAllBoats => 0,
            Operation::QueryBoat => 1,
            Operation::CreateBoat => 5,
        }
    }

    /// Whether a successful call changes the world state.
    pub fn is_write(self) -> bool {
        matches!(self, Operation::InitLedger | Operation::CreateBoat)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| DispatchError::UnknownFunction(s.to_string()))
    }
}

pub fn invoke<S>(
    contract: &BoatContract,
    stub: &mut S,
    function: &str,
    args: &[String],
) -> Result<Value, DispatchError>
where
    S: ChaincodeStub + ?Sized,
{
    let op: Operation = function.parse()?;
    if args.len() != op.arity() {
        return Err(DispatchError::ArgumentCount {
            function: op,
            expected: op.arity(),
            got: args.len(),
        });
    }
    debug!(function = op.name(), args = args.len(), "invoke");
    let result = match op {
        Operation::InitLedger => {
            contract.init_ledger(stub)?;
            Value::Null
        }
        Operation::CreateBoat => {
            contract.create_boat(stub, &args[0], &args[1], &args[2], &args[3], &args[4])?;
            Value::Null
        }
        Operation::QueryBoat => serde_json::to_value(contract.query_boat(&*stub, &args[0])?)?,
        Operation::QueryAllBoats => serde_json::to_value(contract.query_all_boats(&*stub)?)?,
    };
    Ok(result)
}
