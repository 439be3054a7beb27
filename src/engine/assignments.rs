use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;
use super::slots::SlotRegistry;

/// Links appointments to slots. Record insertion and removal happen under the
/// slot's write lock, so a slot's `booked` always equals its live assignments.
pub struct AppointmentBinding {
    assignments: DashMap<Ulid, Assignment>,
    /// Appointment → its live assignment id (at most one).
    by_appointment: DashMap<AppointmentId, Ulid>,
}

impl Default for AppointmentBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentBinding {
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
            by_appointment: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<Assignment> {
        self.assignments.get(id).map(|e| e.value().clone())
    }

    pub fn for_appointment(&self, appointment_id: &AppointmentId) -> Option<Assignment> {
        let id = self.by_appointment.get(appointment_id).map(|e| *e.value())?;
        self.get(&id)
    }

    pub fn count_for_slot(&self, slot_id: SlotId) -> usize {
        self.assignments
            .iter()
            .filter(|e| e.value().slot_id == slot_id)
            .count()
    }

    /// Reserve one unit of `slot_id` and record the assignment. On any error
    /// nothing is recorded and the slot is unchanged.
    ///
    /// The appointment is claimed only once the slot lock is held; nothing
    /// after that point yields.
    pub async fn bind(
        &self,
        appointment_id: AppointmentId,
        slot_id: SlotId,
        staff_id: StaffId,
        slots: &SlotRegistry,
    ) -> Result<Assignment, EngineError> {
        let mut slot = slots.lock(slot_id).await?;

        let id = Ulid::new();
        match self.by_appointment.entry(appointment_id) {
            Entry::Occupied(_) => return Err(EngineError::AppointmentAlreadyAssigned(appointment_id)),
            Entry::Vacant(v) => {
                v.insert(id);
            }
        }
        if let Err(e) = SlotRegistry::reserve_locked(&mut slot) {
            self.by_appointment.remove(&appointment_id);
            return Err(e);
        }

        let assignment = Assignment {
            id,
            appointment_id,
            slot_id,
            staff_id,
            created_at: now_ms(),
        };
        self.assignments.insert(id, assignment.clone());
        drop(slot);

        debug!("appointment {appointment_id} bound to slot {slot_id} as {id}");
        Ok(assignment)
    }

    /// Remove the assignment and return its unit to the slot. A second call
    /// for the same id is `NoSuchAssignment` and touches nothing.
    pub async fn unbind(&self, id: Ulid, slots: &SlotRegistry) -> Result<Assignment, EngineError> {
        let slot_id = self
            .assignments
            .get(&id)
            .map(|e| e.value().slot_id)
            .ok_or(EngineError::NoSuchAssignment(id))?;

        let mut slot = slots.lock(slot_id).await?;
        // A concurrent unbind may have won while we waited for the lock.
        let (_, assignment) = self
            .assignments
            .remove(&id)
            .ok_or(EngineError::NoSuchAssignment(id))?;
        SlotRegistry::release_locked(&mut slot);
        self.by_appointment
            .remove_if(&assignment.appointment_id, |_, live| *live == id);
        drop(slot);

        debug!("assignment {id} removed, slot {slot_id} released");
        Ok(assignment)
    }
}
