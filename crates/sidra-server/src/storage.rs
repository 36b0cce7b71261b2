//! Locality persistence behind a trait. Production deployments would back
//! this with a database; the in-memory implementation is the stand-in the
//! server ships with and what the tests exercise.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateRecord {
    pub id: u64,
    pub sigla: String,
    pub nome: String,
    pub regiao_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionRecord {
    pub id: u64,
    pub sigla: String,
    pub nome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MunicipalityRecord {
    pub id: u64,
    pub nome: String,
    pub estado_id: Option<u64>,
}

/// Completion marker for one synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub tipo: String,
    pub concluida_em: String,
    pub status: String,
}

impl SyncRecord {
    fn now(tipo: &str) -> Self {
        Self {
            tipo: tipo.to_string(),
            concluida_em: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            status: "completo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct StoreCounts {
    pub regioes: usize,
    pub estados: usize,
    pub municipios: usize,
}

#[async_trait]
pub trait LocalityStore: Send + Sync {
    async fn upsert_state(&self, state: StateRecord);
    async fn upsert_region(&self, region: RegionRecord);
    async fn upsert_municipality(&self, municipality: MunicipalityRecord);
    async fn record_sync(&self, tipo: &str);
    async fn last_sync(&self, tipo: &str) -> Option<SyncRecord>;
    async fn counts(&self) -> StoreCounts;
}

#[derive(Debug, Default)]
pub struct MemoryLocalityStore {
    states: RwLock<HashMap<u64, StateRecord>>,
    regions: RwLock<HashMap<u64, RegionRecord>>,
    municipalities: RwLock<HashMap<u64, MunicipalityRecord>>,
    syncs: RwLock<HashMap<String, SyncRecord>>,
}

impl MemoryLocalityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalityStore for MemoryLocalityStore {
    async fn upsert_state(&self, state: StateRecord) {
        self.states.write().await.insert(state.id, state);
    }

    async fn upsert_region(&self, region: RegionRecord) {
        self.regions.write().await.insert(region.id, region);
    }

    async fn upsert_municipality(&self, municipality: MunicipalityRecord) {
        self.municipalities
            .write()
            .await
            .insert(municipality.id, municipality);
    }

    async fn record_sync(&self, tipo: &str) {
        self.syncs
            .write()
            .await
            .insert(tipo.to_string(), SyncRecord::now(tipo));
    }

    async fn last_sync(&self, tipo: &str) -> Option<SyncRecord> {
        self.syncs.read().await.get(tipo).cloned()
    }

    async fn counts(&self) -> StoreCounts {
        StoreCounts {
            regioes: self.regions.read().await.len(),
            estados: self.states.read().await.len(),
            municipios: self.municipalities.read().await.len(),
        }
    }
}
