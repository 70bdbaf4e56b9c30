//! Excel output for a processed upload.

use std::collections::HashMap;

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::attendance::AttendanceReport;
use crate::attendance::summary::{DayStatus, EmployeeSummary};

pub const SUMMARY_FILE: &str = "Summary_Report.xlsx";
pub const DAILY_FILE: &str = "Daily_Details.xlsx";

const SUMMARY_COLUMNS: [(&str, f64); 17] = [
    ("Employee ID", 14.0),
    ("Name", 28.0),
    ("Department", 22.0),
    ("Days Present", 13.0),
    ("Absent Days", 12.0),
    ("Holidays", 10.0),
    ("Special Days", 12.0),
    ("Worked on Holidays", 18.0),
    ("Extra Days", 11.0),
    ("Shortfall", 10.0),
    ("Total Hours", 12.0),
    ("Total Overtime", 14.0),
    ("Delay Hours", 12.0),
    ("Assumed Exit Days", 17.0),
    ("Overtime Requests", 17.0),
    ("Requested OT Hours", 18.0),
    ("Leave Requests", 14.0),
];

const DAILY_COLUMNS: [(&str, f64); 16] = [
    ("Employee ID", 14.0),
    ("Name", 28.0),
    ("Department", 22.0),
    ("Date", 12.0),
    ("Status", 10.0),
    ("Hours", 10.0),
    ("Overtime Delta", 14.0),
    ("Overtime", 10.0),
    ("Delay", 10.0),
    ("Punches", 36.0),
    ("Punch Count", 12.0),
    ("Shifts", 8.0),
    ("Assumed Exit", 13.0),
    ("Holiday", 9.0),
    ("Overtime Request", 28.0),
    ("Leave Request", 28.0),
];

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

fn hours_format() -> Format {
    Format::new().set_num_format("0.00")
}

fn write_header(worksheet: &mut Worksheet, columns: &[(&str, f64)]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, (title, width)) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &format)?;
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

fn finish_table(worksheet: &mut Worksheet, rows: usize, columns: usize) -> Result<(), XlsxError> {
    if rows > 0 {
        worksheet.autofilter(0, 0, rows as u32, (columns - 1) as u16)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// `Summary_Report.xlsx`: one row per employee plus a `Config` sheet with
/// the options the report was produced with.
pub fn summary_workbook(report: &AttendanceReport) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let hours = hours_format();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Summary")?;
    write_header(worksheet, &SUMMARY_COLUMNS)?;

    for (idx, s) in report.summaries.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &s.employee_id)?;
        worksheet.write_string(row, 1, &s.name)?;
        worksheet.write_string(row, 2, &s.department)?;
        worksheet.write_number(row, 3, s.days_present)?;
        worksheet.write_number(row, 4, s.days_absent)?;
        worksheet.write_number(row, 5, s.holiday_days)?;
        worksheet.write_number(row, 6, s.special_days)?;
        worksheet.write_number(row, 7, s.worked_on_holidays)?;
        worksheet.write_number(row, 8, s.extra_days)?;
        worksheet.write_number(row, 9, s.shortfall)?;
        worksheet.write_number_with_format(row, 10, s.total_hours, &hours)?;
        worksheet.write_number_with_format(row, 11, s.total_overtime, &hours)?;
        worksheet.write_number_with_format(row, 12, s.delay_hours, &hours)?;
        worksheet.write_number(row, 13, s.assumed_exit_days)?;
        worksheet.write_number(row, 14, s.overtime_requests)?;
        worksheet.write_number_with_format(row, 15, s.requested_overtime_hours, &hours)?;
        worksheet.write_number(row, 16, s.leave_requests)?;
    }

    finish_table(worksheet, report.summaries.len(), SUMMARY_COLUMNS.len())?;

    let config = workbook.add_worksheet();
    config.set_name("Config")?;
    write_header(config, &[("Setting", 28.0), ("Value", 60.0)])?;

    for (idx, (key, value)) in config_rows(report).iter().enumerate() {
        let row = (idx + 1) as u32;
        config.write_string(row, 0, *key)?;
        config.write_string(row, 1, value)?;
    }
    config.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

fn config_rows(report: &AttendanceReport) -> Vec<(&'static str, String)> {
    let opts = &report.options;
    let join_dates = |dates: &std::collections::BTreeSet<chrono::NaiveDate>| {
        dates.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
    };

    vec![
        ("Worksheet", report.sheet.clone()),
        ("Period start", report.range.start.to_string()),
        ("Period end", report.range.end.to_string()),
        ("Period days", report.range.len().to_string()),
        ("Target days", opts.target_days.to_string()),
        ("Cutoff hour", opts.cutoff_hour.to_string()),
        ("Format", opts.format.to_string()),
        ("Allow negative overtime", yes_no(opts.allow_negative_overtime).to_string()),
        ("Duplicate threshold (minutes)", opts.dup_threshold_minutes.to_string()),
        ("Assumed exit hours", opts.assume_missing_exit_hours.to_string()),
        ("Holidays", join_dates(&opts.holidays)),
        ("Special days", join_dates(&opts.special_days)),
        ("Employees", report.summaries.len().to_string()),
        ("Generated at", report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
    ]
}

/// `Daily_Details.xlsx`: one row per employee and date, in the order of
/// `report.days` (employee, then date).
pub fn daily_workbook(report: &AttendanceReport) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let hours = hours_format();
    let absent = Format::new().set_font_color(Color::RGB(0xC00000));

    let employees: HashMap<&str, &EmployeeSummary> = report
        .summaries
        .iter()
        .map(|s| (s.employee_id.as_str(), s))
        .collect();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Daily")?;
    write_header(worksheet, &DAILY_COLUMNS)?;

    for (idx, day) in report.days.iter().enumerate() {
        let row = (idx + 1) as u32;
        let employee = employees.get(day.employee_id.as_str());

        worksheet.write_string(row, 0, &day.employee_id)?;
        worksheet.write_string(row, 1, employee.map(|e| e.name.as_str()).unwrap_or(""))?;
        worksheet.write_string(row, 2, employee.map(|e| e.department.as_str()).unwrap_or(""))?;
        worksheet.write_string(row, 3, day.date.to_string())?;
        if day.status == DayStatus::Absent {
            worksheet.write_string_with_format(row, 4, day.status.as_ref(), &absent)?;
        } else {
            worksheet.write_string(row, 4, day.status.as_ref())?;
        }
        worksheet.write_number_with_format(row, 5, day.hours, &hours)?;
        worksheet.write_number_with_format(row, 6, day.overtime_delta, &hours)?;
        worksheet.write_number_with_format(row, 7, day.overtime, &hours)?;
        worksheet.write_number_with_format(row, 8, day.delay, &hours)?;
        worksheet.write_string(row, 9, &day.punches)?;
        worksheet.write_number(row, 10, day.punch_count as u32)?;
        worksheet.write_number(row, 11, day.shifts as u32)?;
        worksheet.write_string(row, 12, yes_no(day.assumed_exit))?;
        worksheet.write_string(row, 13, yes_no(day.is_holiday))?;
        worksheet.write_string(row, 14, day.overtime_request.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 15, day.leave_request.as_deref().unwrap_or(""))?;
    }

    finish_table(worksheet, report.days.len(), DAILY_COLUMNS.len())?;

    workbook.save_to_buffer()
}
