//! One-time setup of zones, slots and the staff roster.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::directory::StaticStaffDirectory;
use crate::engine::{Engine, EngineError};
use crate::limits::MAX_STAFF;
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDef {
    pub id: ZoneId,
    pub name: String,
    pub class: ZoneClass,
    pub capacity: u32,
    #[serde(default)]
    pub utilization: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDef {
    pub id: SlotId,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub capacity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provision {
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub slots: Vec<SlotDef>,
    #[serde(default)]
    pub staff: Vec<StaffId>,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parse provisioning document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Provision {
    pub fn from_json(s: &str) -> Result<Self, ProvisionError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProvisionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Build an engine holding exactly what this document describes.
    pub fn into_engine(self) -> Result<Engine, ProvisionError> {
        if self.staff.len() > MAX_STAFF {
            return Err(EngineError::LimitExceeded("too many staff").into());
        }
        let staff_count = self.staff.len();
        let engine = Engine::new(Arc::new(StaticStaffDirectory::new(self.staff)));
        for z in self.zones {
            engine.provision_zone(z.id, z.name, z.class, z.capacity, z.utilization)?;
        }
        for s in self.slots {
            engine.provision_slot(s.id, s.start, s.end, s.capacity)?;
        }
        info!(
            "provisioned {} zones, {} slots, {staff_count} staff",
            engine.zones.len(),
            engine.slots.len()
        );
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "zones": [
            {"id": 1, "name": "A", "class": "priority", "capacity": 100, "utilization": 50},
            {"id": 2, "name": "B", "class": "standard", "capacity": 40},
            {"id": 3, "name": "C", "class": "economy", "capacity": 200, "utilization": 10}
        ],
        "slots": [
            {"id": 1, "start": "09:00:00", "end": "09:30:00", "capacity": 10},
            {"id": 2, "start": "09:30:00", "end": "10:00:00", "capacity": 4}
        ],
        "staff": [100, 101]
    }"#;

    #[tokio::test]
    async fn loads_full_document() {
        let engine = Provision::from_json(DOC).unwrap().into_engine().unwrap();
        let zones = engine.list_zones().await;
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].utilization, 50);
        assert_eq!(zones[1].utilization, 0); // defaulted
        let slots = engine.list_slots(false).await;
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(slots.iter().all(|s| s.booked == 0));
    }

    #[tokio::test]
    async fn staff_roster_is_used() {
        let engine = Provision::from_json(DOC).unwrap().into_engine().unwrap();
        assert!(engine
            .schedule_appointment(AppointmentId(1), SlotId(1), StaffId(100))
            .await
            .is_ok());
        assert_eq!(
            engine
                .schedule_appointment(AppointmentId(2), SlotId(1), StaffId(999))
                .await,
            Err(EngineError::UnknownStaff(StaffId(999)))
        );
    }

    #[test]
    fn empty_document_is_valid() {
        let engine = Provision::from_json("{}").unwrap().into_engine().unwrap();
        assert!(engine.zones.is_empty());
        assert!(engine.slots.is_empty());
    }

    #[test]
    fn duplicate_zone_rejected() {
        let doc = r#"{"zones": [
            {"id": 1, "name": "A", "class": "priority", "capacity": 1},
            {"id": 1, "name": "A2", "class": "priority", "capacity": 1}
        ]}"#;
        let err = Provision::from_json(doc).unwrap().into_engine().err().unwrap();
        assert!(matches!(err, ProvisionError::Engine(EngineError::ZoneExists(ZoneId(1)))));
    }

    #[test]
    fn seeded_utilization_over_capacity_rejected() {
        let doc = r#"{"zones": [{"id": 4, "name": "D", "class": "economy", "capacity": 2, "utilization": 3}]}"#;
        let err = Provision::from_json(doc).unwrap().into_engine().err().unwrap();
        assert!(matches!(
            err,
            ProvisionError::Engine(EngineError::InvalidUtilization { .. })
        ));
    }

    #[test]
    fn inverted_slot_window_rejected() {
        let doc = r#"{"slots": [{"id": 1, "start": "10:00:00", "end": "09:00:00", "capacity": 1}]}"#;
        let err = Provision::from_json(doc).unwrap().into_engine().err().unwrap();
        assert!(matches!(
            err,
            ProvisionError::Engine(EngineError::InvalidSlotWindow(SlotId(1)))
        ));
    }

    #[test]
    fn zero_capacity_rejected() {
        let doc = r#"{"slots": [{"id": 1, "start": "09:00:00", "end": "10:00:00", "capacity": 0}]}"#;
        let err = Provision::from_json(doc).unwrap().into_engine().err().unwrap();
        assert!(matches!(
            err,
            ProvisionError::Engine(EngineError::InvalidCapacity { got: 0, .. })
        ));
    }

    #[test]
    fn unknown_class_is_parse_error() {
        let doc = r#"{"zones": [{"id": 1, "name": "A", "class": "vip", "capacity": 1}]}"#;
        assert!(matches!(Provision::from_json(doc), Err(ProvisionError::Parse(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Provision::load(Path::new("/nonexistent/allot-provision.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/allot-provision.json"));
    }
}
