use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability::{ZONE_ALLOCATIONS_TOTAL, ZONE_UTILIZATION};

use super::EngineError;

pub(crate) type SharedZoneState = Arc<RwLock<ZoneState>>;

/// Owns every zone and its utilization counter.
///
/// Each zone has its own lock. `allocate` locks all zones of one class (in
/// ascending id order) for the duration of select + increment, so selection
/// never acts on a stale view. `release` locks a single zone.
pub struct ZoneRegistry {
    zones: DashMap<ZoneId, SharedZoneState>,
    /// Class → zone ids, kept sorted ascending.
    by_class: DashMap<ZoneClass, Vec<ZoneId>>,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self {
            zones: DashMap::new(),
            by_class: DashMap::new(),
        }
    }

    pub fn provision(
        &self,
        id: ZoneId,
        name: String,
        class: ZoneClass,
        capacity: u32,
        utilization: u32,
    ) -> Result<(), EngineError> {
        if self.zones.len() >= MAX_ZONES {
            return Err(EngineError::LimitExceeded("too many zones"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("zone name too long"));
        }
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(EngineError::InvalidCapacity {
                got: capacity,
                max: MAX_CAPACITY,
            });
        }
        if utilization > capacity {
            return Err(EngineError::InvalidUtilization {
                zone: id,
                utilization,
                capacity,
            });
        }

        match self.zones.entry(id) {
            Entry::Occupied(_) => return Err(EngineError::ZoneExists(id)),
            Entry::Vacant(slot) => {
                let zs = ZoneState::new(id, name, class, capacity, utilization);
                slot.insert(Arc::new(RwLock::new(zs)));
            }
        }
        let mut ids = self.by_class.entry(class).or_default();
        let pos = ids.binary_search(&id).unwrap_or_else(|e| e);
        ids.insert(pos, id);
        drop(ids);

        metrics::gauge!(ZONE_UTILIZATION, "zone" => id.to_string()).set(utilization as f64);
        Ok(())
    }

    pub(crate) fn get(&self, id: &ZoneId) -> Option<SharedZoneState> {
        self.zones.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn ids(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self.zones.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Pick the zone of `tier`'s class with the most remaining capacity
    /// (lowest id on ties) and occupy one unit of it, as one step.
    pub async fn allocate(&self, tier: PriorityTier) -> Result<ZoneId, EngineError> {
        let class = tier.zone_class();
        // Clone the id list so no DashMap shard guard lives across an await.
        let ids = self
            .by_class
            .get(&class)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        // Acquire write locks in sorted order to prevent deadlocks.
        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            let zs = self.get(id).ok_or(EngineError::NoSuchZone(*id))?;
            guards.push(zs.write_owned().await);
        }

        let mut best: Option<usize> = None;
        for (i, guard) in guards.iter().enumerate() {
            let remaining = guard.remaining();
            if remaining == 0 {
                continue;
            }
            // Strictly greater keeps the earlier (lower) id on ties.
            if best.is_none_or(|b| remaining > guards[b].remaining()) {
                best = Some(i);
            }
        }

        let Some(i) = best else {
            metrics::counter!(ZONE_ALLOCATIONS_TOTAL, "outcome" => "exhausted").increment(1);
            return Err(EngineError::CapacityExhausted(tier));
        };
        let chosen = &mut guards[i];
        if !chosen.occupy() {
            return Err(EngineError::CapacityExhausted(tier));
        }
        let id = chosen.id;
        let utilization = chosen.utilization();
        drop(guards);

        metrics::counter!(ZONE_ALLOCATIONS_TOTAL, "outcome" => "accepted").increment(1);
        metrics::gauge!(ZONE_UTILIZATION, "zone" => id.to_string()).set(utilization as f64);
        debug!("allocated zone {id} for {tier} order (utilization {utilization})");
        Ok(id)
    }

    /// Return one unit to `id`, floored at zero. Exactly-once per order is
    /// the order lifecycle's job, not this method's.
    pub async fn release(&self, id: ZoneId) -> Result<(), EngineError> {
        let zs = self.get(&id).ok_or(EngineError::NoSuchZone(id))?;
        let mut guard = zs.write().await;
        guard.vacate();
        let utilization = guard.utilization();
        drop(guard);

        metrics::gauge!(ZONE_UTILIZATION, "zone" => id.to_string()).set(utilization as f64);
        debug!("released zone {id} (utilization {utilization})");
        Ok(())
    }
}
