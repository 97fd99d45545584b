//! Boat registry chaincode.
//!
//! The crate is split into three small layers:
//!
//! * [`ledger`]: the state-access interface a ledger peer hands to chaincode,
//!   plus [`ledger::WorldState`], an in-memory implementation with a JSON
//!   state file and a Merkle state root.
//! * [`contracts`]: the boat contract itself (seed, create, query one,
//!   query all), encoding boats as JSON values in the world state.
//! * [`dispatch`]: routing of named invocations with string arguments onto
//!   the contract, as a host would deliver them.
//!
//! Consensus, ordering and the real state database stay with the ledger
//! platform; the contract only talks to whatever [`ledger::ChaincodeStub`] it
//! is given.

pub mod contracts;
pub mod dispatch;
pub mod ledger;

pub use contracts::{Boat, BoatContract, ContractError, QueryResult};
pub use dispatch::{invoke, DispatchError, Operation};
pub use ledger::{ChaincodeStub, KeyValue, LedgerError, WorldState};
