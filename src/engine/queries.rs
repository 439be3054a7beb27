use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    pub async fn get_zone(&self, id: ZoneId) -> Result<ZoneInfo, EngineError> {
        let zs = self.zones.get(&id).ok_or(EngineError::NoSuchZone(id))?;
        let guard = zs.read().await;
        Ok(guard.info())
    }

    /// All zones, ascending by id.
    pub async fn list_zones(&self) -> Vec<ZoneInfo> {
        let mut out = Vec::with_capacity(self.zones.len());
        for id in self.zones.ids() {
            if let Some(zs) = self.zones.get(&id) {
                out.push(zs.read().await.info());
            }
        }
        out
    }

    pub async fn get_slot(&self, id: SlotId) -> Result<SlotInfo, EngineError> {
        let ss = self.slots.get(&id).ok_or(EngineError::NoSuchSlot(id))?;
        let guard = ss.read().await;
        Ok(guard.info())
    }

    /// All slots ascending by id; with `open_only`, just those with room left.
    pub async fn list_slots(&self, open_only: bool) -> Vec<SlotInfo> {
        let mut out = Vec::with_capacity(self.slots.len());
        for id in self.slots.ids() {
            let Some(ss) = self.slots.get(&id) else { continue };
            let guard = ss.read().await;
            if open_only && guard.remaining() == 0 {
                continue;
            }
            out.push(guard.info());
        }
        out
    }

    pub async fn get_order(&self, id: Ulid) -> Result<Order, EngineError> {
        self.orders.get(&id).await.ok_or(EngineError::NoSuchOrder(id))
    }

    pub fn get_assignment(&self, id: Ulid) -> Result<Assignment, EngineError> {
        self.bindings.get(&id).ok_or(EngineError::NoSuchAssignment(id))
    }

    /// Live assignments referencing `slot_id`, counted under the slot's lock
    /// so the figure is comparable with `booked`.
    pub async fn slot_occupancy(&self, slot_id: SlotId) -> Result<(u32, usize), EngineError> {
        let ss = self.slots.get(&slot_id).ok_or(EngineError::NoSuchSlot(slot_id))?;
        let guard = ss.read().await;
        Ok((guard.booked(), self.bindings.count_for_slot(slot_id)))
    }
}
