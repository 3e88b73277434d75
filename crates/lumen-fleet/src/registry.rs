//! # Sensor Registry
//!
//! Concurrency-safe collection of sensor records; the single point of
//! mutation for the whole fleet.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Registry Locking Model                          │
//! │                                                                     │
//! │  RwLock<HashMap<id, Arc<Mutex<SensorRecord>>>>                      │
//! │      │                     │                                        │
//! │      │                     └── per-sensor Mutex: at most one        │
//! │      │                         mutation per sensor at a time;       │
//! │      │                         DIFFERENT sensors mutate freely      │
//! │      │                         in parallel                          │
//! │      │                                                              │
//! │      └── outer RwLock guards only the map shape (insert/lookup);    │
//! │          held briefly, never across a record mutation               │
//! │                                                                     │
//! │  ORDERING: operations on one sensor id are totally ordered.         │
//! │  Operations on different ids have no mutual ordering.               │
//! │                                                                     │
//! │  READS: get()/snapshot() clone fully-applied records under the      │
//! │  per-sensor lock - no partially-updated fields are observable.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No other component holds a long-lived reference into a record; all
//! access funnels through these methods.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::record::SensorRecord;

// =============================================================================
// Sensor Registry
// =============================================================================

/// Mapping from sensor id to live record. Created once at startup,
/// lives for the process lifetime.
#[derive(Default)]
pub struct SensorRegistry {
    sensors: RwLock<HashMap<String, Arc<Mutex<SensorRecord>>>>,
}

impl SensorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sensors.
    pub async fn len(&self) -> usize {
        self.sensors.read().await.len()
    }

    /// True if no sensors are registered.
    pub async fn is_empty(&self) -> bool {
        self.sensors.read().await.is_empty()
    }

    /// True if the sensor id is registered.
    pub async fn contains(&self, sensor_id: &str) -> bool {
        self.sensors.read().await.contains_key(sensor_id)
    }

    /// Registered sensor ids, sorted for stable iteration.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sensors.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Inserts a record if its id is not yet registered.
    ///
    /// Returns `true` on a true add, `false` if the id already existed
    /// (the existing record is left untouched).
    pub async fn insert(&self, record: SensorRecord) -> bool {
        let mut map = self.sensors.write().await;
        match map.entry(record.sensor_id().to_string()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                debug!(sensor_id = %record.sensor_id(), "Registered new sensor");
                slot.insert(Arc::new(Mutex::new(record)));
                true
            }
        }
    }

    /// Returns a consistent copy of one record, or `None` if unknown.
    ///
    /// The clone is taken under the per-sensor lock, so it always
    /// reflects a fully-applied update.
    pub async fn get(&self, sensor_id: &str) -> Option<SensorRecord> {
        let slot = self.slot(sensor_id).await?;
        let record = slot.lock().await;
        Some(record.clone())
    }

    /// Applies a mutation to one record under its per-sensor lock.
    ///
    /// Returns `None` if the sensor is unknown; the closure is not run.
    /// Mutations for the same id are totally ordered; mutations for
    /// different ids proceed concurrently.
    pub async fn mutate<T>(
        &self,
        sensor_id: &str,
        apply: impl FnOnce(&mut SensorRecord) -> T,
    ) -> Option<T> {
        let slot = self.slot(sensor_id).await?;
        let mut record = slot.lock().await;
        Some(apply(&mut record))
    }

    /// Ordered copies of every record, for read-only consumers
    /// (broadcast, diagnostics).
    ///
    /// Each copy is consistent; the set as a whole is a point-in-time
    /// sweep, not a cross-sensor atomic snapshot.
    pub async fn snapshot(&self) -> Vec<SensorRecord> {
        let slots: Vec<Arc<Mutex<SensorRecord>>> = {
            let map = self.sensors.read().await;
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.into_iter().map(|(_, slot)| slot.clone()).collect()
        };

        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.clone());
        }
        records
    }

    /// Clones the shared slot for one sensor, holding the outer read
    /// lock only for the lookup.
    async fn slot(&self, sensor_id: &str) -> Option<Arc<Mutex<SensorRecord>>> {
        self.sensors.read().await.get(sensor_id).cloned()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::types::{Plant, Position, SensorDescriptor};
    use std::time::Duration;

    fn descriptor(id: &str) -> SensorDescriptor {
        SensorDescriptor {
            id: id.to_string(),
            position: Position {
                id: "p1".to_string(),
                name: "window".to_string(),
                description: String::new(),
            },
            plant: Plant {
                kind: "basil".to_string(),
                required_light_hours: 6,
            },
            sampling_period_secs: 60,
            accumulation_window_minutes: 2,
            listen_port: None,
        }
    }

    fn record(id: &str) -> SensorRecord {
        SensorRecord::from_descriptor(&descriptor(id)).unwrap()
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_on_id() {
        let registry = SensorRegistry::new();
        assert!(registry.insert(record("ldr1")).await);
        assert!(!registry.insert(record("ldr1")).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_mutate_unknown_sensor_skips_closure() {
        let registry = SensorRegistry::new();
        let ran = registry.mutate("ghost", |_| true).await;
        assert_eq!(ran, None);
    }

    #[tokio::test]
    async fn test_get_returns_fully_applied_copy() {
        let registry = SensorRegistry::new();
        registry.insert(record("ldr1")).await;

        registry
            .mutate("ldr1", |rec| {
                rec.position.name = "balcony".to_string();
            })
            .await;

        let copy = registry.get("ldr1").await.unwrap();
        assert_eq!(copy.position.name, "balcony");
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered() {
        let registry = SensorRegistry::new();
        registry.insert(record("ldr2")).await;
        registry.insert(record("ldr1")).await;
        registry.insert(record("ldr3")).await;

        let ids: Vec<String> = registry
            .snapshot()
            .await
            .iter()
            .map(|r| r.sensor_id().to_string())
            .collect();
        assert_eq!(ids, vec!["ldr1", "ldr2", "ldr3"]);
    }

    #[tokio::test]
    async fn test_same_sensor_mutations_are_serialized() {
        // Two tasks mutate the same sensor; the per-sensor lock forces
        // one complete update to happen before the other starts.
        let registry = Arc::new(SensorRegistry::new());
        registry.insert(record("ldr1")).await;

        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for task in 0..2u8 {
            let registry = registry.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .mutate("ldr1", move |_| {
                        let mut log = log.lock().unwrap();
                        log.push((task, "enter"));
                        log.push((task, "exit"));
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = log.lock().unwrap();
        // Entries never interleave: each enter is immediately followed by
        // the same task's exit.
        for pair in log.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0);
            assert_eq!(pair[0].1, "enter");
            assert_eq!(pair[1].1, "exit");
        }
    }

    #[tokio::test]
    async fn test_different_sensors_do_not_block_each_other() {
        let registry = Arc::new(SensorRegistry::new());
        registry.insert(record("ldr1")).await;
        registry.insert(record("ldr2")).await;

        // Hold ldr1's lock open; a mutation of ldr2 must still complete.
        let slot = registry.slot("ldr1").await.unwrap();
        let guard = slot.lock().await;

        let other = registry.clone();
        let done = tokio::time::timeout(Duration::from_secs(1), async move {
            other.mutate("ldr2", |rec| rec.last_value()).await
        })
        .await;

        assert!(done.is_ok(), "ldr2 mutation blocked behind ldr1's lock");
        drop(guard);
    }
}
