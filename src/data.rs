//! Loading of the bundled JSON data files into immutable lookup tables.

use crate::index::{IndexError, ProximityIndex};
use crate::model::{GeoPoint, HotelProfile, RatePlan, Stay};
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid geo data in {}: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: IndexError,
    },
    #[error("duplicate hotel id {id} in {}", path.display())]
    DuplicateRecord { path: PathBuf, id: String },
}

/// Profiles keyed by hotel id.
pub type ProfileTable = HashMap<String, HotelProfile>;

/// Rate plans keyed by hotel and stay window.
pub type RateTable = HashMap<Stay, Vec<RatePlan>>;

/// Read a JSON array of records.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_geo_index(path: &Path) -> Result<ProximityIndex, DataError> {
    let points: Vec<GeoPoint> = load_records(path)?;
    let index = ProximityIndex::build(points).map_err(|source| DataError::Index {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), points = index.len(), cells = index.cell_count(), "geo index built");
    Ok(index)
}

pub fn load_profiles(path: &Path) -> Result<ProfileTable, DataError> {
    let records: Vec<HotelProfile> = load_records(path)?;
    let mut table = HashMap::with_capacity(records.len());
    for profile in records {
        if table.contains_key(&profile.id) {
            return Err(DataError::DuplicateRecord {
                path: path.to_path_buf(),
                id: profile.id,
            });
        }
        table.insert(profile.id.clone(), profile);
    }
    info!(path = %path.display(), hotels = table.len(), "profiles loaded");
    Ok(table)
}

pub fn load_rates(path: &Path) -> Result<RateTable, DataError> {
    let plans: Vec<RatePlan> = load_records(path)?;
    let count = plans.len();
    let mut table: RateTable = HashMap::new();
    for plan in plans {
        table.entry(plan.stay()).or_default().push(plan);
    }
    info!(path = %path.display(), plans = count, stays = table.len(), "rates loaded");
    Ok(table)
}
