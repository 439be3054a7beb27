use std::sync::Arc;

use chrono::NaiveTime;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability::{SLOT_BOOKED, SLOT_RESERVATIONS_TOTAL};

use super::EngineError;

pub(crate) type SharedSlotState = Arc<RwLock<SlotState>>;

/// Owns every time slot and its booking counter, one lock per slot.
pub struct SlotRegistry {
    slots: DashMap<SlotId, SharedSlotState>,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn provision(
        &self,
        id: SlotId,
        start: NaiveTime,
        end: NaiveTime,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if self.slots.len() >= MAX_SLOTS {
            return Err(EngineError::LimitExceeded("too many slots"));
        }
        if start >= end {
            return Err(EngineError::InvalidSlotWindow(id));
        }
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(EngineError::InvalidCapacity {
                got: capacity,
                max: MAX_CAPACITY,
            });
        }
        match self.slots.entry(id) {
            Entry::Occupied(_) => Err(EngineError::SlotExists(id)),
            Entry::Vacant(v) => {
                v.insert(Arc::new(RwLock::new(SlotState::new(id, start, end, capacity))));
                metrics::gauge!(SLOT_BOOKED, "slot" => id.to_string()).set(0.0);
                Ok(())
            }
        }
    }

    pub(crate) fn get(&self, id: &SlotId) -> Option<SharedSlotState> {
        self.slots.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<SlotId> {
        let mut ids: Vec<SlotId> = self.slots.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Acquire the slot's write lock. Binding uses this to keep the assignment
    /// record and the counter in step under one critical section.
    pub(super) async fn lock(
        &self,
        id: SlotId,
    ) -> Result<OwnedRwLockWriteGuard<SlotState>, EngineError> {
        let ss = self.get(&id).ok_or(EngineError::NoSuchSlot(id))?;
        Ok(ss.write_owned().await)
    }

    /// Indivisible check-and-increment. `SlotFull` leaves the slot untouched.
    pub async fn reserve(&self, id: SlotId) -> Result<(), EngineError> {
        let mut guard = self.lock(id).await?;
        Self::reserve_locked(&mut guard)
    }

    /// Decrement `booked`, floored at zero.
    pub async fn release(&self, id: SlotId) -> Result<(), EngineError> {
        let mut guard = self.lock(id).await?;
        Self::release_locked(&mut guard);
        Ok(())
    }

    pub(super) fn reserve_locked(slot: &mut SlotState) -> Result<(), EngineError> {
        if !slot.try_reserve() {
            metrics::counter!(SLOT_RESERVATIONS_TOTAL, "outcome" => "full").increment(1);
            return Err(EngineError::SlotFull(slot.id));
        }
        metrics::counter!(SLOT_RESERVATIONS_TOTAL, "outcome" => "accepted").increment(1);
        metrics::gauge!(SLOT_BOOKED, "slot" => slot.id.to_string()).set(slot.booked() as f64);
        debug!("reserved slot {} ({}/{})", slot.id, slot.booked(), slot.capacity());
        Ok(())
    }

    pub(super) fn release_locked(slot: &mut SlotState) {
        slot.release();
        metrics::gauge!(SLOT_BOOKED, "slot" => slot.id.to_string()).set(slot.booked() as f64);
        debug!("released slot {} ({}/{})", slot.id, slot.booked(), slot.capacity());
    }
}
