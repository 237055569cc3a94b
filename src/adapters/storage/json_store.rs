//! JSON Position Store
//!
//! Keeps every open position in a single `positions.json` array inside the
//! data directory. The whole file is rewritten on each mutation through a
//! temporary file and rename, so a crash leaves either the old or the new
//! contents. Records already on disk are reloaded at startup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Position;
use crate::ports::store::{PositionStore, StoreError};

/// Positions file name inside the data directory
pub const POSITIONS_FILE: &str = "positions.json";

#[derive(Debug)]
pub struct JsonPositionStore {
    path: PathBuf,
    positions: Mutex<HashMap<String, Position>>,
}

impl JsonPositionStore {
    /// Open (or create) the store under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .map_err(|e| StoreError::WriteError(format!("create {}: {}", data_dir.display(), e)))?;

        let path = data_dir.join(POSITIONS_FILE);
        let positions = load(&path)?;

        if !positions.is_empty() {
            tracing::info!(
                count = positions.len(),
                path = %path.display(),
                "Recovered open positions"
            );
        }

        Ok(Self {
            path,
            positions: Mutex::new(positions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy, persist it, then commit in memory
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut HashMap<String, Position>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut positions = self.positions.lock().await;
        let mut next = positions.clone();
        let result = change(&mut next)?;
        if next != *positions {
            save(&self.path, &next)?;
            *positions = next;
        }
        Ok(result)
    }
}

fn load(path: &Path) -> Result<HashMap<String, Position>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path).map_err(|e| StoreError::ReadError(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let records: Vec<Position> =
        serde_json::from_str(&content).map_err(|e| StoreError::CorruptedFile(e.to_string()))?;

    let mut positions = HashMap::with_capacity(records.len());
    for record in records {
        if record.token_address.is_empty() {
            return Err(StoreError::CorruptedFile("record with empty address".to_string()));
        }
        if positions.insert(record.token_address.clone(), record).is_some() {
            return Err(StoreError::CorruptedFile("duplicate address".to_string()));
        }
    }
    Ok(positions)
}

fn save(path: &Path, positions: &HashMap<String, Position>) -> Result<(), StoreError> {
    let mut records: Vec<&Position> = positions.values().collect();
    records.sort_by(|a, b| {
        a.opened_at
            .cmp(&b.opened_at)
            .then_with(|| a.token_address.cmp(&b.token_address))
    });

    let content = serde_json::to_string_pretty(&records)
        .map_err(|e| StoreError::SerializationError(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| StoreError::WriteError(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::WriteError(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl PositionStore for JsonPositionStore {
    async fn create(&self, position: Position) -> Result<(), StoreError> {
        self.mutate(|positions| {
            if positions.contains_key(&position.token_address) {
                return Err(StoreError::AlreadyExists(position.token_address.clone()));
            }
            positions.insert(position.token_address.clone(), position);
            Ok(())
        })
        .await
    }

    async fn get(&self, token_address: &str) -> Result<Option<Position>, StoreError> {
        Ok(self.positions.lock().await.get(token_address).cloned())
    }

    async fn all(&self) -> Result<Vec<Position>, StoreError> {
        let mut all: Vec<Position> = self.positions.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(all)
    }

    async fn decrement_level(
        &self,
        token_address: &str,
        expected_level: u8,
    ) -> Result<Option<Position>, StoreError> {
        self.mutate(|positions| match positions.get_mut(token_address) {
            Some(position) if position.current_tp_level == expected_level && expected_level > 1 => {
                position.current_tp_level -= 1;
                Ok(Some(position.clone()))
            }
            _ => Ok(None),
        })
        .await
    }

    async fn delete(&self, token_address: &str) -> Result<bool, StoreError> {
        self.mutate(|positions| Ok(positions.remove(token_address).is_some()))
            .await
    }
}
