//! Attendance sheet processing: workbook in, summary and daily reports out.

pub mod aggregate;
pub mod detect;
pub mod error;
pub mod package;
pub mod report;
pub mod requests;
pub mod sheet;
pub mod summary;
pub mod values;

#[cfg(test)]
pub(crate) mod testing;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use self::aggregate::{EmployeeBlock, parse_blocks};
use self::detect::FormatMode;
use self::error::ProcessError;
use self::requests::RequestIndex;
use self::summary::{DateRange, DayRecord, EmployeeSummary, build_day_records, summarize};
use crate::model::request::RequestKind;

pub const DEFAULT_TARGET_DAYS: u32 = 26;
pub const DEFAULT_CUTOFF_HOUR: u32 = 7;
pub const DEFAULT_DUP_THRESHOLD_MINUTES: u32 = 60;
pub const DEFAULT_ASSUMED_EXIT_HOURS: f64 = 5.0;
/// Longest first-to-last date span one upload may cover.
pub const MAX_PERIOD_DAYS: i64 = 366;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub sheet: Option<String>,
    pub target_days: u32,
    pub holidays: BTreeSet<NaiveDate>,
    pub special_days: BTreeSet<NaiveDate>,
    pub cutoff_hour: u32,
    pub format: FormatMode,
    pub allow_negative_overtime: bool,
    pub dup_threshold_minutes: u32,
    pub assume_missing_exit_hours: f64,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        ProcessingOptions {
            sheet: None,
            target_days: DEFAULT_TARGET_DAYS,
            holidays: BTreeSet::new(),
            special_days: BTreeSet::new(),
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            format: FormatMode::Auto,
            allow_negative_overtime: false,
            dup_threshold_minutes: DEFAULT_DUP_THRESHOLD_MINUTES,
            assume_missing_exit_hours: DEFAULT_ASSUMED_EXIT_HOURS,
        }
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.target_days == 0 {
            return Err(ProcessError::invalid("target_days", "must be greater than 0"));
        }
        if self.cutoff_hour > 23 {
            return Err(ProcessError::invalid("cutoff_hour", "must be between 0 and 23"));
        }
        if !(0.0..=24.0).contains(&self.assume_missing_exit_hours) {
            return Err(ProcessError::invalid(
                "assume_missing_exit_hours",
                "must be between 0 and 24",
            ));
        }
        Ok(())
    }
}

/// Comma-separated `YYYY-MM-DD` list; blanks are skipped.
pub fn parse_date_list(raw: &str) -> Result<BTreeSet<NaiveDate>, ProcessError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ProcessError::InvalidDate {
                value: s.to_string(),
            })
        })
        .collect()
}

/// HTML checkbox style flag.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Numeric ids order numerically, everything else lexically after them.
pub fn compare_employee_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn file_range(blocks: &[EmployeeBlock]) -> Option<DateRange> {
    let start = blocks.iter().filter_map(EmployeeBlock::first_date).min()?;
    let end = blocks.iter().filter_map(EmployeeBlock::last_date).max()?;
    Some(DateRange { start, end })
}

#[derive(Debug, Clone)]
pub struct AttendanceReport {
    pub sheet: String,
    pub range: DateRange,
    pub options: ProcessingOptions,
    pub summaries: Vec<EmployeeSummary>,
    /// sorted by employee, then date
    pub days: Vec<DayRecord>,
    pub generated_at: NaiveDateTime,
}

/// Parse the workbook and compute every employee's daily records and totals.
pub fn build_report(
    bytes: &[u8],
    opts: &ProcessingOptions,
    requests: &RequestIndex,
) -> Result<AttendanceReport, ProcessError> {
    opts.validate()?;

    let grid = sheet::read_sheet(bytes, opts.sheet.as_deref())?;
    let mut blocks = parse_blocks(&grid.rows, opts)?;
    let range = file_range(&blocks).ok_or(ProcessError::EmptyResult)?;
    if range.len() > MAX_PERIOD_DAYS {
        return Err(ProcessError::PeriodTooLong {
            start: range.start,
            end: range.end,
            days: range.len(),
            max_days: MAX_PERIOD_DAYS,
        });
    }

    blocks.sort_by(|a, b| compare_employee_ids(&a.header.employee_id, &b.header.employee_id));

    let mut summaries = Vec::with_capacity(blocks.len());
    let mut days = Vec::new();

    for block in &blocks {
        let records = build_day_records(block, range, opts, requests);
        summaries.push(summarize(block, &records, range, opts, requests));
        days.extend(records);
    }

    tracing::info!(
        sheet = %grid.name,
        employees = summaries.len(),
        start = %range.start,
        end = %range.end,
        "Attendance report built"
    );

    Ok(AttendanceReport {
        sheet: grid.name,
        range,
        options: opts.clone(),
        summaries,
        days,
        generated_at: Local::now().naive_local(),
    })
}

#[derive(Debug)]
pub struct ReportArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub employees: usize,
}

/// Full pipeline behind `POST /process`: both report workbooks zipped.
pub fn process_workbook(
    bytes: &[u8],
    opts: &ProcessingOptions,
    requests: &RequestIndex,
) -> Result<ReportArchive, ProcessError> {
    let report = build_report(bytes, opts, requests)?;

    let summary = report::summary_workbook(&report).map_err(ProcessError::report)?;
    let daily = report::daily_workbook(&report).map_err(ProcessError::report)?;

    let bytes = package::zip_files(&[(report::SUMMARY_FILE, summary), (report::DAILY_FILE, daily)])?;

    Ok(ReportArchive {
        file_name: package::archive_name(report.generated_at),
        bytes,
        employees: report.summaries.len(),
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileAnalysis {
    #[schema(example = "Sheet1")]
    pub sheet_name: String,
    #[schema(example = 12)]
    pub employees_count: usize,
    /// `legacy`, `timecard`, `mixed` or `unknown`
    #[schema(example = "timecard")]
    pub file_format: String,
    #[schema(example = "2024-01-01", format = "date", value_type = Option<String>)]
    pub first_date: Option<NaiveDate>,
    #[schema(example = "2024-01-31", format = "date", value_type = Option<String>)]
    pub last_date: Option<NaiveDate>,
    pub period_days: i64,
    pub total_rows: usize,
    pub dates_found: usize,
    pub overtime_requests_count: usize,
    pub leave_requests_count: usize,
}

/// Inspect a workbook without producing reports.
pub fn analyze_workbook(
    bytes: &[u8],
    opts: &ProcessingOptions,
    requests: &RequestIndex,
) -> Result<FileAnalysis, ProcessError> {
    let grid = sheet::read_sheet(bytes, opts.sheet.as_deref())?;
    let blocks = parse_blocks(&grid.rows, opts)?;

    let formats: BTreeSet<_> = blocks.iter().map(|b| b.format).collect();
    let file_format = match formats.len() {
        0 => "unknown".to_string(),
        1 => formats.iter().map(|f| f.to_string()).collect(),
        _ => "mixed".to_string(),
    };

    let dates: BTreeSet<NaiveDate> = blocks.iter().flat_map(|b| b.days.keys().copied()).collect();
    let range = file_range(&blocks);

    let (overtime, leave) = range
        .map(|r| {
            (
                requests.total_in_range(RequestKind::Overtime, r.start, r.end),
                requests.total_in_range(RequestKind::Leave, r.start, r.end),
            )
        })
        .unwrap_or((0, 0));

    Ok(FileAnalysis {
        sheet_name: grid.name,
        employees_count: blocks.len(),
        file_format,
        first_date: range.map(|r| r.start),
        last_date: range.map(|r| r.end),
        period_days: range.map(|r| r.len()).unwrap_or(0),
        total_rows: grid.rows.len(),
        dates_found: dates.len(),
        overtime_requests_count: overtime,
        leave_requests_count: leave,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::summary::DayStatus;
    use crate::attendance::testing::{legacy_workbook, timecard_workbook, workbook};
    use actix_web::ResponseError;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use zip::ZipArchive;

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn date_lists_parse_and_reject_garbage() {
        let dates = parse_date_list(" 2024-01-01, ,2024-01-05").unwrap();
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![ymd(1), ymd(5)]);

        let err = parse_date_list("2024-01-01,01/05/2024").unwrap_err();
        assert!(matches!(err, ProcessError::InvalidDate { value } if value == "01/05/2024"));
    }

    #[test]
    fn flags_accept_checkbox_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag("On"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let zero_target = ProcessingOptions {
            target_days: 0,
            ..ProcessingOptions::default()
        };
        let late_cutoff = ProcessingOptions {
            cutoff_hour: 24,
            ..ProcessingOptions::default()
        };

        assert!(matches!(
            zero_target.validate(),
            Err(ProcessError::InvalidField { field, .. }) if field == "target_days"
        ));
        assert!(late_cutoff.validate().is_err());
    }

    #[test]
    fn report_covers_the_whole_file_range() {
        let bytes = timecard_workbook();
        let report = build_report(&bytes, &ProcessingOptions::default(), &RequestIndex::default()).unwrap();

        assert_eq!(report.range, DateRange { start: ymd(1), end: ymd(3) });
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.days.len(), 6);
        assert!(report.days.iter().all(|d| report.range.contains(d.date)));

        let ids: Vec<&str> = report.summaries.iter().map(|s| s.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["7", "102"]);

        let present = report.days.iter().filter(|d| d.status == DayStatus::Present).count() as u32;
        let summed: u32 = report.summaries.iter().map(|s| s.days_present).sum();
        assert_eq!(summed, present);
    }

    #[test]
    fn night_shift_lands_on_clock_in_date() {
        let bytes = timecard_workbook();
        let report = build_report(&bytes, &ProcessingOptions::default(), &RequestIndex::default()).unwrap();

        let night = report
            .days
            .iter()
            .find(|d| d.employee_id == "102" && d.date == ymd(1))
            .unwrap();
        assert_eq!(night.hours, 4.0);
        assert_eq!(night.punches, "22:00:00, 02:00:00");
    }

    #[test]
    fn legacy_workbook_is_processed() {
        let bytes = legacy_workbook();
        let report = build_report(&bytes, &ProcessingOptions::default(), &RequestIndex::default()).unwrap();

        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].name, "Sara");
        assert_eq!(report.summaries[0].total_hours, 15.5);
    }

    #[test]
    fn sheet_without_data_rows_is_an_empty_result() {
        let bytes = workbook("Sheet1", &[&["Employee ID: 1, First Name: Ali"], &["Date", "Times", "Time"]]);
        let err = build_report(&bytes, &ProcessingOptions::default(), &RequestIndex::default()).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyResult));

        let no_headers = workbook("Sheet1", &[&["just", "text"]]);
        let err = process_workbook(&no_headers, &ProcessingOptions::default(), &RequestIndex::default())
            .unwrap_err();
        assert!(matches!(err, ProcessError::EmptyResult));
    }

    #[test]
    fn stray_date_outside_a_year_is_rejected() {
        let bytes = workbook(
            "Sheet1",
            &[
                &["Employee ID: 102, First Name: Ali"],
                &["Date", "Times", "Time"],
                &["2024-01-02", "2", "08:00,16:00"],
                &["2204-01-05", "2", "08:00,16:00"],
            ],
        );

        let err = process_workbook(&bytes, &ProcessingOptions::default(), &RequestIndex::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::PeriodTooLong { end, .. } if end == NaiveDate::from_ymd_opt(2204, 1, 5).unwrap()
        ));
        assert!(err.to_string().contains("2204-01-05"));
        assert_eq!(err.status_code(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn full_year_is_accepted() {
        let bytes = workbook(
            "Sheet1",
            &[
                &["Employee ID: 102, First Name: Ali"],
                &["Date", "Times", "Time"],
                &["2024-01-01", "2", "08:00,16:00"],
                &["2024-12-31", "2", "08:00,16:00"],
            ],
        );

        let report = build_report(&bytes, &ProcessingOptions::default(), &RequestIndex::default()).unwrap();
        assert_eq!(report.range.len(), MAX_PERIOD_DAYS);
        assert_eq!(report.days.len(), 366);
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let opts = ProcessingOptions {
            sheet: Some("March".into()),
            ..ProcessingOptions::default()
        };
        let err = build_report(&timecard_workbook(), &opts, &RequestIndex::default()).unwrap_err();
        assert!(matches!(err, ProcessError::SheetNotFound { sheet } if sheet == "March"));
    }

    #[test]
    fn archive_holds_both_reports() {
        let archive =
            process_workbook(&timecard_workbook(), &ProcessingOptions::default(), &RequestIndex::default())
                .unwrap();

        assert!(archive.file_name.starts_with("attendance_reports_"));
        assert!(archive.file_name.ends_with(".zip"));
        assert_eq!(archive.employees, 2);

        let zip = ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["Daily_Details.xlsx", "Summary_Report.xlsx"]);
    }

    #[test]
    fn analysis_reports_layout_and_period() {
        let mut requests = RequestIndex::default();
        requests.insert("102", RequestKind::Overtime, ymd(2), "inventory");
        requests.insert("102", RequestKind::Leave, ymd(20), "outside the file range");

        let analysis = analyze_workbook(&timecard_workbook(), &ProcessingOptions::default(), &requests).unwrap();

        assert_eq!(analysis.sheet_name, "Sheet1");
        assert_eq!(analysis.employees_count, 2);
        assert_eq!(analysis.file_format, "timecard");
        assert_eq!(analysis.first_date, Some(ymd(1)));
        assert_eq!(analysis.last_date, Some(ymd(3)));
        assert_eq!(analysis.period_days, 3);
        assert_eq!(analysis.overtime_requests_count, 1);
        assert_eq!(analysis.leave_requests_count, 0);
    }
}
