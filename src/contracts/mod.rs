use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ledger::{ChaincodeStub, LedgerError, StateKey};

/// First key of the boat listing range (inclusive).
pub const BOAT_RANGE_START: &str = "BOAT0";
/// End of the boat listing range (exclusive).
pub const BOAT_RANGE_END: &str = "BOAT999";

const SEED_BOATS: [(&str, &str, &str, &str); 10] = [
    ("Toyota", "Prius", "blue", "Tomoko"),
    ("Ford", "Mustang", "red", "Brad"),
    ("Hyundai", "Tucson", "green", "Jin Soo"),
    ("Volkswagen", "Passat", "yellow", "Max"),
    ("Tesla", "S", "black", "Adriana"),
    ("Peugeot", "205", "purple", "Michel"),
    ("Chery", "S22L", "white", "Aarav"),
    ("Fiat", "Punto", "violet", "Pari"),
    ("Tata", "Nano", "indigo", "Valeria"),
    ("Holden", "Barina", "brown", "Shotaro"),
];

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("failed to put {key} to world state: {source}")]
    WriteFailure {
        key: StateKey,
        #[source]
        source: LedgerError,
    },
    #[error("failed to read {key} from world state: {source}")]
    ReadFailure {
        key: StateKey,
        #[source]
        source: LedgerError,
    },
    #[error("boat does not exist: {0}")]
    NotFound(StateKey),
    #[error("stored value under {key} is not a boat: {source}")]
    Decode {
        key: StateKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("range scan failed: {0}")]
    RangeFailure(#[source] LedgerError),
    #[error("failed to encode boat: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Boat {
    pub make: String,
    pub model: String,
    pub colour: String,
    pub owner: String,
}

impl Boat {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        colour: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            colour: colour.into(),
            owner: owner.into(),
        }
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes).map_err(|source| ContractError::Decode {
            key: key.to_string(),
            source,
        })
    }
}

/// One row of a boat listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResult {
    #[serde(rename = "Key")]
    pub key: StateKey,
    #[serde(rename = "Record")]
    pub record: Boat,
}

/// The ten boats written by [`BoatContract::init_ledger`], keyed `BOAT0..BOAT9`.
pub fn seed_boats() -> Vec<(StateKey, Boat)> {
    SEED_BOATS
        .iter()
        .enumerate()
        .map(|(i, (make, model, colour, owner))| {
            (format!("BOAT{i}"), Boat::new(*make, *model, *colour, *owner))
        })
        .collect()
}

/// Boat registry operations. Holds no state of its own; every call works
/// against the stub it is handed.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoatContract;

impl BoatContract {
    pub fn new() -> Self {
        Self
    }

    /// Seeds `BOAT0..BOAT9`. Stops at the first failed write; boats written
    /// before it are left in place.
    pub fn init_ledger<S>(&self, stub: &mut S) -> Result<(), ContractError>
    where
        S: ChaincodeStub + ?Sized,
    {
        let boats = seed_boats();
        let count = boats.len();
        for (key, boat) in boats {
            put_boat(stub, &key, &boat)?;
        }
        info!(count, "ledger seeded");
        Ok(())
    }

    pub fn create_boat<S>(
        &self,
        stub: &mut S,
        key: &str,
        make: &str,
        model: &str,
        colour: &str,
        owner: &str,
    ) -> Result<(), ContractError>
    where
        S: ChaincodeStub + ?Sized,
    {
        let boat = Boat::new(make, model, colour, owner);
        put_boat(stub, key, &boat)?;
        info!(key, "boat written");
        Ok(())
    }

    pub fn query_boat<S>(&self, stub: &S, key: &str) -> Result<Boat, ContractError>
    where
        S: ChaincodeStub + ?Sized,
    {
        let bytes = stub
            .get_state(key)
            .map_err(|source| ContractError::ReadFailure {
                key: key.to_string(),
                source,
            })?
            .ok_or_else(|| ContractError::NotFound(key.to_string()))?;
        Boat::decode(key, &bytes)
    }

    /// Lists every boat in `[BOAT0, BOAT999)` in key order. A failed step of
    /// the scan or an undecodable record aborts the whole listing.
    pub fn query_all_boats<S>(&self, stub: &S) -> Result<Vec<QueryResult>, ContractError>
    where
        S: ChaincodeStub + ?Sized,
    {
        let iter = stub
            .get_state_by_range(BOAT_RANGE_START, BOAT_RANGE_END)
            .map_err(ContractError::RangeFailure)?;
        let mut results = Vec::new();
        for entry in iter {
            let entry = entry.map_err(ContractError::RangeFailure)?;
            let record = Boat::decode(&entry.key, &entry.value)?;
            results.push(QueryResult {
                key: entry.key,
                record,
            });
        }
        info!(count = results.len(), "boats listed");
        Ok(results)
    }
}

fn put_boat<S>(stub: &mut S, key: &str, boat: &Boat) -> Result<(), ContractError>
where
    S: ChaincodeStub + ?Sized,
{
    let bytes = serde_json::to_vec(boat)?;
    stub.put_state(key, bytes)
        .map_err(|source| ContractError::WriteFailure {
            key: key.to_string(),
            source,
        })
}
