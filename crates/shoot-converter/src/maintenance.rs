//! Maintenance windows
//!
//! Region → daily maintenance window, read from a JSON document shaped
//! `{region: {"begin": "220000+0000", "end": "000000+0000"}}`.

use crate::error::MaintenanceError;
use gardener_client::MaintenanceTimeWindow;
use std::collections::BTreeMap;

/// Source of per-region maintenance windows.
pub trait MaintenanceWindowSource: Send + Sync {
    fn lookup(&self, region: &str) -> Result<MaintenanceTimeWindow, MaintenanceError>;
}

#[derive(Debug, Clone, Default)]
pub struct FileMaintenanceWindowSource {
    windows: BTreeMap<String, MaintenanceTimeWindow>,
}

impl FileMaintenanceWindowSource {
    pub fn from_path(path: &str) -> Result<Self, MaintenanceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| MaintenanceError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, MaintenanceError> {
        Ok(Self {
            windows: serde_json::from_str(raw)?,
        })
    }
}

impl MaintenanceWindowSource for FileMaintenanceWindowSource {
    fn lookup(&self, region: &str) -> Result<MaintenanceTimeWindow, MaintenanceError> {
        self.windows
            .get(region)
            .cloned()
            .ok_or_else(|| MaintenanceError::RegionNotFound(region.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_for_region() {
        let source = FileMaintenanceWindowSource::from_json(
            r#"{"eu-central-1": {"begin": "210000+0000", "end": "000000+0000"}}"#,
        )
        .unwrap();

        let window = source.lookup("eu-central-1").unwrap();
        assert_eq!(window.begin, "210000+0000");
        assert_eq!(window.end, "000000+0000");
        assert!(matches!(source.lookup("us-east-1"), Err(MaintenanceError::RegionNotFound(r)) if r == "us-east-1"));
    }

    #[test]
    fn malformed_document() {
        assert!(matches!(
            FileMaintenanceWindowSource::from_json("[1, 2]"),
            Err(MaintenanceError::Parse(_))
        ));
    }
}
