//! File-backed snapshot source.
//!
//! Reads the fleet snapshot from `sensors_config.json` on every load, so
//! the reconcile worker always sees the file as saved. Parse and I/O
//! failures surface as load errors and leave the running fleet alone.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use lumen_core::types::FleetSnapshot;
use lumen_fleet::error::{FleetError, FleetResult};
use lumen_fleet::SnapshotSource;

/// Snapshot source over a JSON file on disk.
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: PathBuf) -> Self {
        FileSnapshotSource { path }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn load(&self) -> FleetResult<FleetSnapshot> {
        debug!(path = %self.path.display(), "Loading fleet snapshot");

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FleetError::SnapshotLoadFailed(format!("{}: {e}", self.path.display()))
        })?;

        let snapshot: FleetSnapshot = serde_json::from_str(&raw)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "sensors": [
            {
                "id": "1",
                "position": {"id": "p1", "name": "living room window"},
                "plant": {"type": "basil", "required_light_hours": 6},
                "sampling_period_secs": 60,
                "accumulation_window_minutes": 2,
                "listen_port": 5683
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_loads_snapshot_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors_config.json");
        std::fs::write(&path, VALID).unwrap();

        let snapshot = FileSnapshotSource::new(path).load().await.unwrap();
        assert_eq!(snapshot.sensors.len(), 1);
        assert_eq!(snapshot.sensors[0].id, "1");
        assert_eq!(snapshot.sensors[0].plant.kind, "basil");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_load_error() {
        let source = FileSnapshotSource::new(PathBuf::from("/nonexistent/sensors.json"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, FleetError::SnapshotLoadFailed(_)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors_config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let err = FileSnapshotSource::new(path).load().await.unwrap_err();
        assert!(matches!(err, FleetError::SnapshotLoadFailed(_)));
    }

    #[tokio::test]
    async fn test_sees_file_changes_between_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors_config.json");
        std::fs::write(&path, r#"{"sensors": []}"#).unwrap();

        let source = FileSnapshotSource::new(path.clone());
        assert!(source.load().await.unwrap().is_empty());

        std::fs::write(&path, VALID).unwrap();
        assert_eq!(source.load().await.unwrap().sensors.len(), 1);
    }
}
