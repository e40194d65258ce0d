//! In-memory measurement table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Configuration;
use crate::domain::ports::MeasurementSource;

/// Measured configurations, matched by configuration equality.
#[derive(Default)]
pub struct MeasurementTable {
    rows: RwLock<HashMap<Configuration, Configuration>>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_measurements<I>(measurements: I) -> Self
    where
        I: IntoIterator<Item = Configuration>,
    {
        let rows = measurements
            .into_iter()
            .map(|config| (config.clone(), config))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Load measurements from a JSON array of configurations.
    pub async fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::Serialization(format!("cannot read {}: {e}", path.display()))
        })?;
        let measurements: Vec<Configuration> = serde_json::from_str(&raw)?;
        Ok(Self::from_measurements(measurements))
    }

    pub async fn insert(&self, measurement: Configuration) {
        self.rows
            .write()
            .await
            .insert(measurement.clone(), measurement);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl MeasurementSource for MeasurementTable {
    async fn measure(&self, configurations: Vec<Configuration>) -> DomainResult<Vec<Configuration>> {
        let rows = self.rows.read().await;
        let requested = configurations.len();
        let measured: Vec<Configuration> = configurations
            .into_iter()
            .filter_map(|mut config| {
                let row = rows.get(&config)?;
                config.merge_nfp_values(row);
                Some(config)
            })
            .collect();
        debug!(requested, measured = measured.len(), "looked up measurements");
        Ok(measured)
    }
}
