use crate::api::attendance::{
    AttendanceListResponse, AttendanceQuery, CheckInReq, GenerateQrReq, GenerateQrResponse,
};
use crate::api::staff::{CreateStaff, StaffListResponse, StaffQuery};
use crate::api::task::{CreateTask, TaskFilter, TaskListResponse, UpdateTaskStatus};
use crate::checkin::Coordinate;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::staff::StaffProfile;
use crate::model::task::Task;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SANGBO BERDE Operations API",
        version = "1.0.0",
        description = r#"
## SANGBO BERDE municipal waste-collection operations backend

This API powers the dashboards and mobile flows of the SANGBO BERDE
waste-collection and composting platform.

### 🔹 Key Features
- **QR Attendance**
  - Supervisors issue time-boxed, GPS-anchored QR tokens
  - Field staff check in by scanning; the scan is validated against the
    device's live position (Haversine distance, 100 m default tolerance)
  - Check-out and supervisor revisions (late marking)
- **Workforce Management**
  - Create, update, list, and view staff profiles per barangay
- **Task Management**
  - Assign collection/composting tasks and track their lifecycle

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
QR issuance and attendance revisions require **Admin** or **Supervisor** roles.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::generate_qr,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::update_attendance,

        crate::api::staff::create_staff,
        crate::api::staff::get_staff,
        crate::api::staff::list_staff,
        crate::api::staff::update_staff,
        crate::api::staff::delete_staff,

        crate::api::task::create_task,
        crate::api::task::get_task,
        crate::api::task::list_tasks,
        crate::api::task::update_task_status
    ),
    components(
        schemas(
            GenerateQrReq,
            GenerateQrResponse,
            CheckInReq,
            AttendanceQuery,
            AttendanceListResponse,
            AttendanceRecord,
            AttendanceStatus,
            Coordinate,
            CreateStaff,
            StaffQuery,
            StaffListResponse,
            StaffProfile,
            CreateTask,
            TaskFilter,
            TaskListResponse,
            UpdateTaskStatus,
            Task
        )
    ),
    tags(
        (name = "Attendance", description = "QR attendance check-in/check-out APIs"),
        (name = "Staff", description = "Workforce management APIs"),
        (name = "Task", description = "Collection and composting task APIs"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
