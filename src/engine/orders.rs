use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;
use super::zones::ZoneRegistry;

/// Order records and their status machine. Each order has its own lock so
/// that the release guard is evaluated once per transition.
pub struct OrderLifecycle {
    orders: DashMap<Ulid, Arc<Mutex<Order>>>,
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderLifecycle {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub(super) fn validate(new: &NewOrder) -> Result<(), EngineError> {
        if new.amount_cents < 0 {
            return Err(EngineError::InvalidAmount(new.amount_cents));
        }
        if new.items.len() > MAX_ORDER_LINES {
            return Err(EngineError::LimitExceeded("too many order lines"));
        }
        Ok(())
    }

    /// Record an order already bound to `zone_id`. Status starts at `Preparing`.
    pub(super) fn create(&self, new: NewOrder, zone_id: ZoneId) -> Order {
        let order = Order {
            id: Ulid::new(),
            customer_id: new.customer_id,
            created_at: now_ms(),
            status: OrderStatus::Preparing,
            amount_cents: new.amount_cents,
            priority: new.priority,
            zone_id: Some(zone_id),
            items: new.items,
        };
        self.orders
            .insert(order.id, Arc::new(Mutex::new(order.clone())));
        order
    }

    pub async fn get(&self, id: &Ulid) -> Option<Order> {
        let entry = self.orders.get(id).map(|e| e.value().clone())?;
        let guard = entry.lock().await;
        Some(guard.clone())
    }

    /// Point-in-time copy of every order. Each record is read under its own lock.
    pub async fn snapshot(&self) -> Vec<Order> {
        let entries: Vec<_> = self.orders.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.lock().await.clone());
        }
        out
    }

    /// Move an order to `next`.
    ///
    /// - same status: no-op, no zone accounting
    /// - edge not in the lifecycle graph: `InvalidTransition`, nothing changes
    /// - entering `Completed` or `Canceled`: the bound zone is released once
    ///
    /// The order lock is held across the guard and the release, so concurrent
    /// updates to the same order cannot both observe a live status.
    pub async fn transition(
        &self,
        id: Ulid,
        next: OrderStatus,
        zones: &ZoneRegistry,
    ) -> Result<Order, EngineError> {
        let entry = self
            .orders
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NoSuchOrder(id))?;
        let mut order = entry.lock().await;
        let prev = order.status;

        if prev == next {
            return Ok(order.clone());
        }
        if !prev.can_transition_to(next) {
            return Err(EngineError::InvalidTransition { from: prev, to: next });
        }
        if prev.releases_zone(next)
            && let Some(zone_id) = order.zone_id
        {
            zones.release(zone_id).await?;
        }

        order.status = next;
        debug!("order {id}: {prev} -> {next}");
        Ok(order.clone())
    }
}
