#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Supervisor = 2,
    Collector = 3,
    FacilityStaff = 4,
    Citizen = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Supervisor),
            3 => Some(Role::Collector),
            4 => Some(Role::FacilityStaff),
            5 => Some(Role::Citizen),
            _ => None,
        }
    }

    /// Collectors and facility staff check in through the mobile QR flow.
    pub fn is_field_staff(&self) -> bool {
        matches!(self, Role::Collector | Role::FacilityStaff)
    }
}
