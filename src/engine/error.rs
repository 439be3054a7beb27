use thiserror::Error;
use ulid::Ulid;

use crate::model::{AppointmentId, OrderStatus, PriorityTier, SlotId, StaffId, ZoneId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no {0}-priority zone has free capacity")]
    CapacityExhausted(PriorityTier),
    #[error("slot {0} is fully booked")]
    SlotFull(SlotId),
    #[error("no such zone: {0}")]
    NoSuchZone(ZoneId),
    #[error("no such slot: {0}")]
    NoSuchSlot(SlotId),
    #[error("no such assignment: {0}")]
    NoSuchAssignment(Ulid),
    #[error("no such order: {0}")]
    NoSuchOrder(Ulid),
    #[error("invalid order transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("appointment {0} already has a live assignment")]
    AppointmentAlreadyAssigned(AppointmentId),
    #[error("unknown staff member: {0}")]
    UnknownStaff(StaffId),
    #[error("zone already exists: {0}")]
    ZoneExists(ZoneId),
    #[error("slot already exists: {0}")]
    SlotExists(SlotId),
    #[error("capacity must be between 1 and {max}, got {got}")]
    InvalidCapacity { got: u32, max: u32 },
    #[error("slot {0} must start before it ends")]
    InvalidSlotWindow(SlotId),
    #[error("zone {zone} utilization {utilization} exceeds capacity {capacity}")]
    InvalidUtilization {
        zone: ZoneId,
        utilization: u32,
        capacity: u32,
    },
    #[error("order amount must not be negative, got {0}")]
    InvalidAmount(i64),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Expected business outcomes: the caller should try another zone tier or
    /// slot rather than treat the request as broken.
    pub fn is_business_outcome(&self) -> bool {
        matches!(self, EngineError::CapacityExhausted(_) | EngineError::SlotFull(_))
    }

    /// Stable machine-readable code for replies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::CapacityExhausted(_) => "capacity_exhausted",
            EngineError::SlotFull(_) => "slot_full",
            EngineError::NoSuchZone(_) => "no_such_zone",
            EngineError::NoSuchSlot(_) => "no_such_slot",
            EngineError::NoSuchAssignment(_) => "no_such_assignment",
            EngineError::NoSuchOrder(_) => "no_such_order",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::AppointmentAlreadyAssigned(_) => "appointment_already_assigned",
            EngineError::UnknownStaff(_) => "unknown_staff",
            EngineError::ZoneExists(_) => "zone_exists",
            EngineError::SlotExists(_) => "slot_exists",
            EngineError::InvalidCapacity { .. } => "invalid_capacity",
            EngineError::InvalidSlotWindow(_) => "invalid_slot_window",
            EngineError::InvalidUtilization { .. } => "invalid_utilization",
            EngineError::InvalidAmount(_) => "invalid_amount",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}
