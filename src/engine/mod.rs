mod assignments;
mod error;
mod orders;
mod queries;
mod slots;
mod zones;

pub use assignments::AppointmentBinding;
pub use error::EngineError;
pub use orders::OrderLifecycle;
pub use slots::SlotRegistry;
pub use zones::ZoneRegistry;

use std::sync::Arc;

use chrono::NaiveTime;
use tracing::info;
use ulid::Ulid;

use crate::directory::StaffDirectory;
use crate::model::*;

/// The allocation engine: the only entry point for order intake and
/// appointment booking. Holds no state of its own beyond its components.
///
/// Order operations touch only zones; appointment operations touch only
/// slots. No call path holds a lock of one kind while waiting on the other.
pub struct Engine {
    pub zones: ZoneRegistry,
    pub slots: SlotRegistry,
    pub orders: OrderLifecycle,
    pub bindings: AppointmentBinding,
    staff: Arc<dyn StaffDirectory>,
}

impl Engine {
    pub fn new(staff: Arc<dyn StaffDirectory>) -> Self {
        Self {
            zones: ZoneRegistry::new(),
            slots: SlotRegistry::new(),
            orders: OrderLifecycle::new(),
            bindings: AppointmentBinding::new(),
            staff,
        }
    }

    // ── Provisioning ─────────────────────────────────────────

    pub fn provision_zone(
        &self,
        id: ZoneId,
        name: impl Into<String>,
        class: ZoneClass,
        capacity: u32,
        utilization: u32,
    ) -> Result<(), EngineError> {
        self.zones.provision(id, name.into(), class, capacity, utilization)?;
        info!("provisioned zone {id} ({class:?}, capacity {capacity}, utilization {utilization})");
        Ok(())
    }

    pub fn provision_slot(
        &self,
        id: SlotId,
        start: NaiveTime,
        end: NaiveTime,
        capacity: u32,
    ) -> Result<(), EngineError> {
        self.slots.provision(id, start, end, capacity)?;
        info!("provisioned slot {id} ({start}-{end}, capacity {capacity})");
        Ok(())
    }

    // ── Orders ───────────────────────────────────────────────

    /// Bind a new order to a zone of its tier. If no zone has room the order
    /// is rejected with `CapacityExhausted` and nothing is recorded.
    pub async fn place_order(&self, new: NewOrder) -> Result<Order, EngineError> {
        OrderLifecycle::validate(&new)?;
        let zone_id = self.zones.allocate(new.priority).await?;
        let order = self.orders.create(new, zone_id);
        info!("order {} placed in zone {zone_id}", order.id);
        Ok(order)
    }

    pub async fn update_order_status(
        &self,
        order_id: Ulid,
        status: OrderStatus,
    ) -> Result<Order, EngineError> {
        self.orders.transition(order_id, status, &self.zones).await
    }

    // ── Appointments ─────────────────────────────────────────

    /// Book `appointment_id` into `slot_id` with `staff_id`. `SlotFull` is an
    /// expected outcome; the caller should offer another slot.
    pub async fn schedule_appointment(
        &self,
        appointment_id: AppointmentId,
        slot_id: SlotId,
        staff_id: StaffId,
    ) -> Result<Assignment, EngineError> {
        if !self.staff.contains(staff_id).await {
            return Err(EngineError::UnknownStaff(staff_id));
        }
        let assignment = self
            .bindings
            .bind(appointment_id, slot_id, staff_id, &self.slots)
            .await?;
        info!(
            "appointment {appointment_id} scheduled in slot {slot_id} with staff {staff_id} ({})",
            assignment.id
        );
        Ok(assignment)
    }

    /// The only supported way to free slot capacity.
    pub async fn cancel_assignment(&self, assignment_id: Ulid) -> Result<Assignment, EngineError> {
        let assignment = self.bindings.unbind(assignment_id, &self.slots).await?;
        info!("assignment {assignment_id} cancelled, slot {} freed", assignment.slot_id);
        Ok(assignment)
    }
}
