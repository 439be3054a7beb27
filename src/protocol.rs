use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;

/// One request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    PlaceOrder(NewOrder),
    UpdateOrderStatus {
        order_id: Ulid,
        status: OrderStatus,
    },
    ScheduleAppointment {
        appointment_id: AppointmentId,
        slot_id: SlotId,
        staff_id: StaffId,
    },
    CancelAssignment {
        assignment_id: Ulid,
    },
    GetOrder {
        order_id: Ulid,
    },
    GetAssignment {
        assignment_id: Ulid,
    },
    ListZones,
    ListSlots {
        #[serde(default)]
        open_only: bool,
    },
}

/// Successful payload, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Order(Order),
    Assignment(Assignment),
    Zones { zones: Vec<ZoneInfo> },
    Slots { slots: Vec<SlotInfo> },
}

/// One reply line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok { result: Outcome },
    Error { code: String, message: String },
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok { .. })
    }
}

impl From<Result<Outcome, EngineError>> for Reply {
    fn from(r: Result<Outcome, EngineError>) -> Self {
        match r {
            Ok(result) => Reply::Ok { result },
            Err(e) => Reply::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl From<ProtocolError> for Reply {
    fn from(e: ProtocolError) -> Self {
        Reply::Error {
            code: "bad_request".to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}
