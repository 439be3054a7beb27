use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds.
pub type Ms = i64;

pub fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(
    /// Provisioned storage zone. Ordering is the allocation tie-break.
    ZoneId(u32)
);
id_newtype!(SlotId(u32));
id_newtype!(CustomerId(u64));
id_newtype!(StaffId(u64));
id_newtype!(AppointmentId(u64));
id_newtype!(ItemId(u64));

/// Priority an order is placed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// The only zone class an order of this tier may occupy.
    pub fn zone_class(self) -> ZoneClass {
        match self {
            PriorityTier::High => ZoneClass::Priority,
            PriorityTier::Medium => ZoneClass::Standard,
            PriorityTier::Low => ZoneClass::Economy,
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
            PriorityTier::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneClass {
    Priority,
    Standard,
    Economy,
}

// ── Zones ────────────────────────────────────────────────────────

/// Mutable zone state. Only the zone registry holds these, behind a lock.
#[derive(Debug, Clone)]
pub struct ZoneState {
    pub id: ZoneId,
    pub name: String,
    pub class: ZoneClass,
    capacity: u32,
    utilization: u32,
}

impl ZoneState {
    /// Caller guarantees `utilization <= capacity`.
    pub(crate) fn new(id: ZoneId, name: String, class: ZoneClass, capacity: u32, utilization: u32) -> Self {
        debug_assert!(utilization <= capacity);
        Self {
            id,
            name,
            class,
            capacity,
            utilization,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn utilization(&self) -> u32 {
        self.utilization
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.utilization)
    }

    /// Take one unit. Returns false (and changes nothing) when full.
    pub(crate) fn occupy(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.utilization += 1;
        true
    }

    /// Return one unit, floored at zero.
    pub(crate) fn vacate(&mut self) {
        self.utilization = self.utilization.saturating_sub(1);
    }

    pub fn info(&self) -> ZoneInfo {
        ZoneInfo {
            id: self.id,
            name: self.name.clone(),
            class: self.class,
            capacity: self.capacity,
            utilization: self.utilization,
        }
    }
}

// ── Time slots ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SlotState {
    pub id: SlotId,
    pub start: NaiveTime,
    pub end: NaiveTime,
    capacity: u32,
    booked: u32,
}

impl SlotState {
    pub(crate) fn new(id: SlotId, start: NaiveTime, end: NaiveTime, capacity: u32) -> Self {
        Self {
            id,
            start,
            end,
            capacity,
            booked: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn booked(&self) -> u32 {
        self.booked
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked)
    }

    /// Check-and-increment. The caller holds the slot's write lock, so the
    /// check and the increment cannot be interleaved with another reservation.
    pub(crate) fn try_reserve(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.booked += 1;
        true
    }

    pub(crate) fn release(&mut self) {
        self.booked = self.booked.saturating_sub(1);
    }

    pub fn info(&self) -> SlotInfo {
        SlotInfo {
            id: self.id,
            start: self.start,
            end: self.end,
            capacity: self.capacity,
            booked: self.booked,
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Preparing,
    ReadyForPickup,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    /// Self-loops are not edges; callers treat them as no-ops.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Preparing, ReadyForPickup)
                | (Preparing, Canceled)
                | (ReadyForPickup, Completed)
                | (ReadyForPickup, Canceled)
        )
    }

    /// One-shot release guard: the zone goes back exactly when an order
    /// leaves the live states for a terminal one.
    pub fn releases_zone(self, next: OrderStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// Intake payload for `place_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    /// Minor currency units. Must not be negative.
    pub amount_cents: i64,
    pub priority: PriorityTier,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Ulid,
    pub customer_id: CustomerId,
    pub created_at: Ms,
    pub status: OrderStatus,
    pub amount_cents: i64,
    pub priority: PriorityTier,
    /// Set once at creation, never reassigned. Kept after release for history.
    pub zone_id: Option<ZoneId>,
    pub items: Vec<OrderLine>,
}

impl Order {
    /// True while the order still counts against its zone.
    pub fn occupies_zone(&self) -> bool {
        self.zone_id.is_some() && !self.status.is_terminal()
    }
}

// ── Assignments ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Ulid,
    pub appointment_id: AppointmentId,
    pub slot_id: SlotId,
    pub staff_id: StaffId,
    pub created_at: Ms,
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub id: ZoneId,
    pub name: String,
    pub class: ZoneClass,
    pub capacity: u32,
    pub utilization: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub id: SlotId,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
}
