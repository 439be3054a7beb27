use std::collections::HashSet;

use async_trait::async_trait;

use crate::model::StaffId;

/// Read-only view of the staff roster. The engine only asks whether an id
/// exists; rosters and availability are managed elsewhere.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn contains(&self, staff_id: StaffId) -> bool;
}

/// In-memory roster loaded at provisioning time.
#[derive(Debug, Default, Clone)]
pub struct StaticStaffDirectory {
    staff: HashSet<StaffId>,
}

impl StaticStaffDirectory {
    pub fn new(staff: impl IntoIterator<Item = StaffId>) -> Self {
        Self {
            staff: staff.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.staff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }
}

#[async_trait]
impl StaffDirectory for StaticStaffDirectory {
    async fn contains(&self, staff_id: StaffId) -> bool {
        self.staff.contains(&staff_id)
    }
}
