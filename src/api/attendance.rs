use crate::{
    api::request::active_requests,
    attendance::{
        ProcessingOptions, analyze_workbook, detect::FormatMode, error::ProcessError,
        parse_date_list, parse_flag, process_workbook, requests::RequestIndex, FileAnalysis,
    },
    auth::auth::AuthUser,
    model::permission::Service,
    store::DocumentStore,
};
use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use actix_web::{
    HttpResponse, Responder,
    error::ErrorInternalServerError,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use std::str::FromStr;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

/// Upload form shared by `/process` and `/api/attendance/analyze`.
/// Every setting is optional and falls back to its default.
#[derive(MultipartForm, ToSchema)]
pub struct AttendanceUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Option<TempFile>,
    #[schema(value_type = Option<String>, example = "Sheet1")]
    pub sheet: Option<Text<String>>,
    #[schema(value_type = Option<u32>, example = 26)]
    pub target_days: Option<Text<String>>,
    /// Comma-separated `YYYY-MM-DD`
    #[schema(value_type = Option<String>, example = "2024-01-05,2024-01-06")]
    pub holidays: Option<Text<String>>,
    #[schema(value_type = Option<String>, example = "2024-01-10")]
    pub special_days: Option<Text<String>>,
    #[schema(value_type = Option<u32>, example = 7)]
    pub cutoff_hour: Option<Text<String>>,
    /// `auto`, `legacy` or `timecard`
    #[schema(value_type = Option<String>, example = "auto")]
    pub format: Option<Text<String>>,
    #[schema(value_type = Option<String>, example = "false")]
    pub allow_negative: Option<Text<String>>,
    #[schema(value_type = Option<u32>, example = 60)]
    pub dup_threshold_minutes: Option<Text<String>>,
    #[schema(value_type = Option<f64>, example = 5.0)]
    pub assume_missing_exit_hours: Option<Text<String>>,
}

fn text(field: &Option<Text<String>>) -> Option<&str> {
    field.as_ref().map(|t| t.trim()).filter(|t| !t.is_empty())
}

fn number<T: FromStr>(field: &Option<Text<String>>, name: &str, default: T) -> Result<T, ProcessError> {
    match text(field) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ProcessError::invalid(name, format!("'{}' is not a valid number", raw))),
        None => Ok(default),
    }
}

impl AttendanceUpload {
    pub fn options(&self) -> Result<ProcessingOptions, ProcessError> {
        let defaults = ProcessingOptions::default();

        let format = match text(&self.format) {
            Some(raw) => FormatMode::from_str(raw)
                .map_err(|_| ProcessError::invalid("format", "expected auto, legacy or timecard"))?,
            None => FormatMode::Auto,
        };

        let opts = ProcessingOptions {
            sheet: text(&self.sheet).map(str::to_string),
            target_days: number(&self.target_days, "target_days", defaults.target_days)?,
            holidays: text(&self.holidays).map(parse_date_list).transpose()?.unwrap_or_default(),
            special_days: text(&self.special_days)
                .map(parse_date_list)
                .transpose()?
                .unwrap_or_default(),
            cutoff_hour: number(&self.cutoff_hour, "cutoff_hour", defaults.cutoff_hour)?,
            format,
            allow_negative_overtime: text(&self.allow_negative).is_some_and(parse_flag),
            dup_threshold_minutes: number(
                &self.dup_threshold_minutes,
                "dup_threshold_minutes",
                defaults.dup_threshold_minutes,
            )?,
            assume_missing_exit_hours: number(
                &self.assume_missing_exit_hours,
                "assume_missing_exit_hours",
                defaults.assume_missing_exit_hours,
            )?,
        };

        opts.validate()?;
        Ok(opts)
    }

    /// The uploaded workbook, which must be an `.xlsx` file.
    pub fn take_workbook(&mut self) -> Result<TempFile, ProcessError> {
        let file = self.file.take().ok_or_else(|| ProcessError::missing("file"))?;
        let file_name = file.file_name.clone().unwrap_or_default();

        if file_name.trim().is_empty() {
            return Err(ProcessError::missing("file"));
        }
        if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
            return Err(ProcessError::UnsupportedFile { file_name });
        }

        Ok(file)
    }
}

fn read_upload(file: &TempFile) -> Result<Vec<u8>, ProcessError> {
    std::fs::read(file.file.path()).map_err(|e| ProcessError::malformed(format!("could not read upload: {}", e)))
}

async fn request_index(store: &dyn DocumentStore) -> actix_web::Result<RequestIndex> {
    let requests = active_requests(store).await?;
    Ok(RequestIndex::from_requests(&requests))
}

/// Process Attendance Sheet
///
/// Returns a ZIP with `Summary_Report.xlsx` and `Daily_Details.xlsx`.
#[utoipa::path(
    post,
    path = "/process",
    request_body(content = AttendanceUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Report archive", content_type = "application/zip", body = Vec<u8>),
        (status = 400, description = "Invalid upload or settings", body = Object, example = json!({
            "error": "Unsupported file type 'hours.csv'. Please upload an .xlsx workbook"
        })),
        (status = 403, description = "Attendance service required"),
        (status = 422, description = "No attendance records found", body = Object, example = json!({
            "error": "No attendance records found in the uploaded file"
        }))
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "attendance_process", skip_all, fields(user = %auth.username))]
pub async fn process(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    MultipartForm(mut form): MultipartForm<AttendanceUpload>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Attendance)?;

    let opts = form.options()?;
    let upload = form.take_workbook()?;
    let requests = request_index(store.get_ref()).await?;

    info!(
        file = upload.file_name.as_deref().unwrap_or_default(),
        size = upload.size,
        "Processing attendance upload"
    );

    // the temp file is dropped, and so deleted, on the worker thread
    let archive = web::block(move || {
        let bytes = read_upload(&upload)?;
        process_workbook(&bytes, &opts, &requests)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Attendance worker failed");
        ErrorInternalServerError("Something went wrong, Contact with system admin")
    })??;

    info!(employees = archive.employees, file = %archive.file_name, "Attendance reports generated");

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(archive.file_name)],
        })
        .body(archive.bytes))
}

/// Analyze Attendance Sheet
///
/// Reads the workbook and reports what it contains, without generating reports.
#[utoipa::path(
    post,
    path = "/api/attendance/analyze",
    request_body(content = AttendanceUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Workbook overview", body = FileAnalysis),
        (status = 400, description = "Invalid upload or settings")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(name = "attendance_analyze", skip_all, fields(user = %auth.username))]
pub async fn analyze(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    MultipartForm(mut form): MultipartForm<AttendanceUpload>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Attendance)?;

    let opts = form.options()?;
    let upload = form.take_workbook()?;
    let requests = request_index(store.get_ref()).await?;

    let analysis = web::block(move || {
        let bytes = read_upload(&upload)?;
        analyze_workbook(&bytes, &opts, &requests)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Attendance worker failed");
        ErrorInternalServerError("Something went wrong, Contact with system admin")
    })??;

    Ok(HttpResponse::Ok().json(analysis))
}

#[cfg(test)]
mod tests {
    use super::AttendanceUpload;
    use crate::api::testing::{bearer, store, test_app};
    use crate::attendance::{ProcessingOptions, error::ProcessError};
    use crate::attendance::testing::{legacy_workbook, timecard_workbook};
    use crate::model::{
        permission::Service,
        request::{Request, RequestKind, RequestStatus},
    };
    use crate::store::Repository;
    use actix_multipart::form::text::Text;
    use actix_web::{http::StatusCode, test, web::Bytes};
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::io::{Cursor, Read};

    const BOUNDARY: &str = "attendance-test-boundary";

    /// multipart/form-data body with one file part and any text parts
    fn form(file_name: &str, file: &[u8], fields: &[(&str, &str)]) -> (String, Bytes) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        (format!("multipart/form-data; boundary={}", BOUNDARY), Bytes::from(body))
    }

    fn upload(uri: &str, auth: String, file_name: &str, file: &[u8], fields: &[(&str, &str)]) -> actix_web::test::TestRequest {
        let (content_type, body) = form(file_name, file, fields);
        test::TestRequest::post()
            .uri(uri)
            .insert_header(("Authorization", auth))
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn process_returns_zip_with_both_reports() {
        let store = store();
        let app = test_app!(store);
        let auth = bearer("sara", false, &[Service::Attendance]);

        let req = upload("/process", auth, "january.xlsx", &timecard_workbook(), &[("target_days", "2")]).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/zip");
        let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("attendance_reports_"));

        let bytes = test::read_body(resp).await;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["Daily_Details.xlsx", "Summary_Report.xlsx"]);

        let mut summary = Vec::new();
        archive.by_name("Summary_Report.xlsx").unwrap().read_to_end(&mut summary).unwrap();
        assert!(summary.starts_with(b"PK"));
    }

    #[actix_web::test]
    async fn process_validates_upload() {
        let store = store();
        let app = test_app!(store);
        let auth = bearer("sara", false, &[Service::Attendance]);

        let req = upload("/process", auth.clone(), "hours.csv", b"a,b", &[]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("hours.csv"));

        let req = upload("/process", auth.clone(), "a.xlsx", &timecard_workbook(), &[("target_days", "0")]).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = upload("/process", auth.clone(), "a.xlsx", &timecard_workbook(), &[("holidays", "01/05/2024")]).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = upload("/process", auth.clone(), "a.xlsx", &timecard_workbook(), &[("format", "weekly")]).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let empty = crate::attendance::testing::workbook("Sheet1", &[&["nothing here"]]);
        let req = upload("/process", auth, "a.xlsx", &empty, &[]).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    fn blank_form() -> AttendanceUpload {
        AttendanceUpload {
            file: None,
            sheet: None,
            target_days: None,
            holidays: None,
            special_days: None,
            cutoff_hour: None,
            format: None,
            allow_negative: None,
            dup_threshold_minutes: None,
            assume_missing_exit_hours: None,
        }
    }

    #[::core::prelude::v1::test]
    fn options_read_pairing_settings() {
        let defaults = blank_form().options().unwrap();
        assert_eq!(defaults, ProcessingOptions::default());

        let form = AttendanceUpload {
            dup_threshold_minutes: Some(Text(" 15 ".to_string())),
            assume_missing_exit_hours: Some(Text("2.5".to_string())),
            cutoff_hour: Some(Text("0".to_string())),
            ..blank_form()
        };
        let opts = form.options().unwrap();
        assert_eq!(opts.dup_threshold_minutes, 15);
        assert_eq!(opts.assume_missing_exit_hours, 2.5);
        assert_eq!(opts.cutoff_hour, 0);

        let form = AttendanceUpload {
            dup_threshold_minutes: Some(Text("-5".to_string())),
            ..blank_form()
        };
        assert!(matches!(
            form.options().unwrap_err(),
            ProcessError::InvalidField { field, .. } if field == "dup_threshold_minutes"
        ));

        let form = AttendanceUpload {
            assume_missing_exit_hours: Some(Text("30".to_string())),
            ..blank_form()
        };
        assert!(matches!(
            form.options().unwrap_err(),
            ProcessError::InvalidField { field, .. } if field == "assume_missing_exit_hours"
        ));
    }

    #[actix_web::test]
    async fn pairing_settings_arrive_through_the_form() {
        let store = store();
        let app = test_app!(store);
        let auth = bearer("sara", false, &[Service::Attendance]);

        let fields = [("dup_threshold_minutes", "0"), ("assume_missing_exit_hours", "3.5")];
        let req = upload("/api/attendance/analyze", auth.clone(), "a.xlsx", &timecard_workbook(), &fields).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        for (name, value) in [("dup_threshold_minutes", "ten"), ("assume_missing_exit_hours", "25")] {
            let req = upload("/process", auth.clone(), "a.xlsx", &timecard_workbook(), &[(name, value)]).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert!(body["error"].as_str().unwrap().contains(name));
        }
    }

    #[actix_web::test]
    async fn process_requires_attendance_service() {
        let store = store();
        let app = test_app!(store);

        let auth = bearer("omar", false, &[Service::Overtime]);
        let req = upload("/process", auth, "a.xlsx", &timecard_workbook(), &[]).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let (content_type, body) = form("a.xlsx", &timecard_workbook(), &[]);
        let req = test::TestRequest::post()
            .uri("/process")
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn analyze_reports_format_range_and_requests() {
        let store = store();
        let requests = Repository::<Request>::new(store.as_ref());
        for (kind, status) in [
            (RequestKind::Overtime, RequestStatus::Active),
            (RequestKind::Overtime, RequestStatus::Canceled),
            (RequestKind::Leave, RequestStatus::Active),
        ] {
            let request = Request {
                id: String::new(),
                employee_id: "7".into(),
                kind,
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                reason: "audit".into(),
                supervisor: "sara".into(),
                status,
                created_at: Utc::now(),
                canceled_by: None,
                canceled_at: None,
            };
            requests.create(None, &request).await.unwrap();
        }
        let app = test_app!(store);
        let auth = bearer("root", true, &[]);

        let req = upload("/api/attendance/analyze", auth.clone(), "a.xlsx", &timecard_workbook(), &[]).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["employees_count"], 2);
        assert_eq!(body["file_format"], "timecard");
        assert_eq!(body["first_date"], "2024-01-01");
        assert_eq!(body["last_date"], "2024-01-03");
        assert_eq!(body["period_days"], 3);
        assert_eq!(body["overtime_requests_count"], 1);
        assert_eq!(body["leave_requests_count"], 1);

        let req = upload(
            "/api/attendance/analyze",
            auth,
            "b.XLSX",
            &legacy_workbook(),
            &[("sheet", "Attendance")],
        )
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["sheet_name"], "Attendance");
        assert_eq!(body["file_format"], "legacy");
    }
}
