use crate::api::attendance::AttendanceUpload;
use crate::api::employee::{CreateEmployee, UpdateEmployee, UpdateEmployeeStatus};
use crate::api::request::CreateRequest;
use crate::api::users::{ApprovePending, CreateUser, UpdateUser};
use crate::attendance::FileAnalysis;
use crate::attendance::detect::FormatMode;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::pending_user::PendingUserView;
use crate::model::permission::Service;
use crate::model::request::{Request, RequestKind, RequestStatus};
use crate::model::user::UserView;
use crate::models::{LoginReqDto, LoginResponse, SignupReq};
use crate::utils::db_utils::{EmployeeListResponse, RequestListResponse};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance & HR API",
        version = "1.0.0",
        description = r#"
## Attendance reporting and HR directory

Upload a fingerprint-clock export and get back a ZIP with a per-employee
summary workbook and a day-by-day details workbook.

### 🔹 Key Features
- **Attendance Reports**
  - Legacy (`First Punch | Last Punch`) and timecard (`Date | Times | Time`) exports
  - Night shifts folded back onto the clock-in day
  - Holidays, special days, overtime and shortfall against a monthly target
- **Employee Directory**
  - Create, update, list and deactivate employees
- **Overtime & Leave Requests**
  - Filed by supervisors, shown on the daily report
- **Accounts**
  - Sign-up queue approved by a super-admin, per-service permissions

### 🔐 Security
Everything except `/health`, `/api/login` and `/api/signup` needs a
**JWT Bearer** token from `/api/login`.
"#,
    ),
    paths(
        crate::api::health::health,

        crate::auth::handlers::login,
        crate::auth::handlers::signup,

        crate::api::attendance::process,
        crate::api::attendance::analyze,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::set_employee_status,
        crate::api::employee::delete_employee,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::toggle_user_status,
        crate::api::users::list_pending,
        crate::api::users::approve_pending,
        crate::api::users::reject_pending,

        crate::api::request::create_request,
        crate::api::request::list_requests,
        crate::api::request::latest_requests,
        crate::api::request::cancel_request
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            SignupReq,
            AttendanceUpload,
            FileAnalysis,
            FormatMode,
            Employee,
            EmployeeStatus,
            CreateEmployee,
            UpdateEmployee,
            UpdateEmployeeStatus,
            EmployeeListResponse,
            UserView,
            PendingUserView,
            CreateUser,
            UpdateUser,
            ApprovePending,
            Service,
            Request,
            RequestKind,
            RequestStatus,
            CreateRequest,
            RequestListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Login and sign-up"),
        (name = "Attendance", description = "Attendance sheet processing"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Admin", description = "Account administration, super-admin only"),
        (name = "Requests", description = "Overtime and leave requests"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
}
