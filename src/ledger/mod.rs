use std::{collections::BTreeMap, fs, ops::Bound, path::Path};

use sha2::{Digest, Sha256};
use tracing::debug;

pub type StateKey = String;

/// Entries produced by a range scan, in ascending key order.
pub type StateIterator<'a> = Box<dyn Iterator<Item = Result<KeyValue, LedgerError>> + 'a>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("state key must not be empty")]
    EmptyKey,
    #[error("invalid range: start {start:?} sorts after end {end:?}")]
    InvalidRange { start: StateKey, end: StateKey },
    #[error("state file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed state file: {0}")]
    Snapshot(String),
    #[error("state backend failure: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: StateKey,
    pub value: Vec<u8>,
}

/// Per-invocation handle onto the world state.
///
/// Range scans treat `start` as inclusive and `end` as exclusive, comparing
/// keys as byte strings. An empty bound leaves that side of the range open.
/// The returned iterator holds the scan open until it is dropped.
pub trait ChaincodeStub {
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn get_state_by_range<'a>(
        &'a self,
        start: &str,
        end: &str,
    ) -> Result<StateIterator<'a>, LedgerError>;
}

/// In-memory world state, optionally persisted as a JSON document of
/// hex-encoded values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldState {
    entries: BTreeMap<StateKey, Vec<u8>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a state file; a file that does not exist yet is an empty state.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)?;
        let encoded: BTreeMap<StateKey, String> =
            serde_json::from_str(&raw).map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        let mut entries = BTreeMap::new();
        for (key, value_hex) in encoded {
            let value = hex::decode(value_hex.trim())
                .map_err(|e| LedgerError::Snapshot(format!("value of {key:?}: {e}")))?;
            entries.insert(key, value);
        }
        debug!(path = %path.display(), entries = entries.len(), "state file loaded");
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let encoded: BTreeMap<&str, String> = self
            .entries
            .iter()
            .map(|(key, value)| (key.as_str(), hex::encode(value)))
            .collect();
        let json = serde_json::to_string_pretty(&encoded)
            .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        debug!(path = %path.display(), entries = self.entries.len(), "state file saved");
        Ok(())
    }

    /// Merkle root over every `(key, value)` pair in key order.
    pub fn state_root(&self) -> [u8; 32] {
        let leaves = self
            .entries
            .iter()
            .map(|(key, value)| -> [u8; 32] {
                let mut hasher = Sha256::new();
                hasher.update(b"kv");
                hasher.update((key.len() as u64).to_le_bytes());
                hasher.update(key.as_bytes());
                hasher.update(value);
                hasher.finalize().into()
            })
            .collect();
        build_merkle(leaves)
    }
}

impl ChaincodeStub for WorldState {
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        debug!(key, bytes = value.len(), "put_state");
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::EmptyKey);
        }
        let value = self.entries.get(key).cloned();
        debug!(key, found = value.is_some(), "get_state");
        Ok(value)
    }

    fn get_state_by_range<'a>(
        &'a self,
        start: &str,
        end: &str,
    ) -> Result<StateIterator<'a>, LedgerError> {
        if !start.is_empty() && !end.is_empty() && start > end {
            return Err(LedgerError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        debug!(start, end, "get_state_by_range");
        let iter = self
            .entries
            .range::<str, _>((lower, upper))
            .map(|(key, value)| {
                Ok(KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                })
            });
        Ok(Box::new(iter))
    }
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"boat-world-state-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(state: &WorldState, start: &str, end: &str) -> Vec<String> {
        state
            .get_state_by_range(start, end)
            .unwrap()
            .map(|kv| kv.unwrap().key)
            .collect()
    }

    fn sample_state() -> WorldState {
        let mut state = WorldState::new();
        for key in ["BOAT0", "BOAT1", "BOAT10", "BOAT2", "BOAT999", "BOATA", "CAR1"] {
            state.put_state(key, key.as_bytes().to_vec()).unwrap();
        }
        state
    }

    #[test]
    fn range_is_lexicographic_and_half_open() {
        let state = sample_state();
        assert_eq!(
            keys(&state, "BOAT0", "BOAT999"),
            vec!["BOAT0", "BOAT1", "BOAT10", "BOAT2"]
        );
    }

    #[test]
    fn empty_bounds_leave_range_open() {
        let state = sample_state();
        assert_eq!(keys(&state, "", "BOAT1"), vec!["BOAT0"]);
        assert_eq!(keys(&state, "BOATA", ""), vec!["BOATA", "CAR1"]);
        assert_eq!(keys(&state, "", "").len(), state.len());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let state = sample_state();
        let err = state.get_state_by_range("BOAT9", "BOAT0").err().unwrap();
        assert!(matches!(err, LedgerError::InvalidRange { .. }));
        assert!(keys(&state, "BOAT1", "BOAT1").is_empty());
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut state = WorldState::new();
        assert!(matches!(
            state.put_state("", b"x".to_vec()),
            Err(LedgerError::EmptyKey)
        ));
        assert!(matches!(state.get_state(""), Err(LedgerError::EmptyKey)));
        assert!(state.is_empty());
    }

    #[test]
    fn put_overwrites_previous_value() {
        let mut state = WorldState::new();
        state.put_state("BOAT1", b"old".to_vec()).unwrap();
        state.put_state("BOAT1", b"new".to_vec()).unwrap();
        assert_eq!(state.get_state("BOAT1").unwrap(), Some(b"new".to_vec()));
        assert_eq!(state.get_state("BOAT2").unwrap(), None);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn state_file_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let state = sample_state();
        state.save(&path).unwrap();
        let loaded = WorldState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.state_root(), state.state_root());
    }

    #[test]
    fn missing_state_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = WorldState::load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn malformed_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"BOAT0": "zz"}"#).unwrap();
        assert!(matches!(
            WorldState::load(&path),
            Err(LedgerError::Snapshot(_))
        ));
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            WorldState::load(&path),
            Err(LedgerError::Snapshot(_))
        ));
    }

    #[test]
    fn state_root_is_deterministic_and_tracks_content() {
        let empty = WorldState::new().state_root();
        let a = sample_state();
        let b = sample_state();
        assert_eq!(a.state_root(), b.state_root());
        assert_ne!(a.state_root(), empty);

        let mut c = sample_state();
        c.put_state("BOAT1", b"changed".to_vec()).unwrap();
        assert_ne!(c.state_root(), a.state_root());
    }
}
