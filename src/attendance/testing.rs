//! Workbook fixtures shared by the attendance tests.

use rust_xlsxwriter::Workbook;

use crate::attendance::requests::RequestIndex;
use crate::attendance::{AttendanceReport, ProcessingOptions, build_report};

/// One worksheet with every cell written as text; empty strings are skipped.
pub fn workbook(sheet: &str, rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();

    for (r, cells) in rows.iter().enumerate() {
        for (c, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// Two timecard employees over 2024-01-01..03; employee 102 works a night
/// shift ending 02:00 on the 2nd.
pub fn timecard_workbook() -> Vec<u8> {
    workbook(
        "Sheet1",
        &[
            &["Employee ID: 102, First Name: Ali, Department: Drivers"],
            &["Date", "Times", "Time"],
            &["2024-01-01", "1", "22:00"],
            &["2024-01-02", "3", "02:00,08:00,15:00"],
            &["2024-01-03", "2", "08:00,16:00"],
            &["Employee ID: 7, First Name: Sara, Department: HR"],
            &["Date", "Times", "Time"],
            &["2024-01-02", "2", "09:00,17:00"],
        ],
    )
}

pub fn legacy_workbook() -> Vec<u8> {
    workbook(
        "Attendance",
        &[
            &["Employee ID: 7", "First Name: Sara", "Department: HR"],
            &["Date", "Day", "First Punch", "Last Punch"],
            &["2024-01-01", "Mon", "08:00", "16:30"],
            &["2024-01-02", "Tue", "09:00", "16:00"],
        ],
    )
}

pub fn sample_report() -> AttendanceReport {
    build_report(
        &timecard_workbook(),
        &ProcessingOptions::default(),
        &RequestIndex::default(),
    )
    .unwrap()
}
