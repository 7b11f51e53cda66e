use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "staff_code": "SB-0042",
        "full_name": "Juan Dela Cruz",
        "email": "juan.delacruz@sangboberde.ph",
        "phone": "+639171234567",
        "role_id": 3,
        "barangay": "Barangay A",
        "hire_date": "2024-03-15",
        "status": "active"
    })
)]
pub struct StaffProfile {
    #[schema(example = 42)]
    pub id: u64,

    #[schema(example = "SB-0042")]
    pub staff_code: String,

    #[schema(example = "Juan Dela Cruz")]
    pub full_name: String,

    #[schema(example = "juan.delacruz@sangboberde.ph")]
    pub email: String,

    #[schema(example = "+639171234567", nullable = true)]
    pub phone: Option<String>,

    /// Role id, same mapping as auth roles (3 collector, 4 facility staff).
    #[schema(example = 3)]
    pub role_id: u8,

    #[schema(example = "Barangay A")]
    pub barangay: String,

    #[schema(example = "2024-03-15", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}
