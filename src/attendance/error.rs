use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

/// Everything that can go wrong while turning an upload into reports.
///
/// All variants are client-facing: the message is returned verbatim in the
/// `{"error": ...}` body.
#[derive(Debug, Display, Error)]
pub enum ProcessError {
    #[display(fmt = "Missing required field: {}", field)]
    MissingField { field: String },

    #[display(fmt = "Invalid value for '{}': {}", field, reason)]
    InvalidField { field: String, reason: String },

    #[display(fmt = "Unsupported file type '{}'. Please upload an .xlsx workbook", file_name)]
    UnsupportedFile { file_name: String },

    #[display(fmt = "Worksheet '{}' not found in workbook", sheet)]
    SheetNotFound { sheet: String },

    #[display(fmt = "Malformed workbook: {}", reason)]
    MalformedWorkbook { reason: String },

    #[display(fmt = "Unrecognized spreadsheet format: {}", detail)]
    UnrecognizedFormat { detail: String },

    #[display(fmt = "Invalid date '{}'. Expected YYYY-MM-DD", value)]
    InvalidDate { value: String },

    #[display(
        fmt = "Dates span {} to {} ({} days); at most {} days can be processed. Check column A for a stray date",
        start,
        end,
        days,
        max_days
    )]
    PeriodTooLong {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        days: i64,
        max_days: i64,
    },

    #[display(fmt = "No attendance records found in the uploaded file")]
    EmptyResult,

    #[display(fmt = "Failed to generate report: {}", reason)]
    Report { reason: String },
}

impl ProcessError {
    pub fn missing(field: &str) -> Self {
        ProcessError::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ProcessError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        ProcessError::MalformedWorkbook {
            reason: reason.to_string(),
        }
    }

    pub fn report(reason: impl std::fmt::Display) -> Self {
        ProcessError::Report {
            reason: reason.to_string(),
        }
    }
}

impl ResponseError for ProcessError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProcessError::EmptyResult => StatusCode::UNPROCESSABLE_ENTITY,
            ProcessError::Report { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}
