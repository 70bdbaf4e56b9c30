use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::attendance::error::ProcessError;
use crate::attendance::values::{CellValue, cell_text};

/// Layout of the rows under an employee header.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SheetFormat {
    /// `Date | Day | First Punch | Last Punch`
    Legacy,
    /// `Date | Times | Time` where the last column holds a comma-separated punch list
    Timecard,
}

/// What the caller asked for: detect per block, or force one layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FormatMode {
    #[default]
    Auto,
    Legacy,
    Timecard,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmployeeHeader {
    pub employee_id: String,
    pub name: Option<String>,
    pub department: Option<String>,
}

/// Recognizes an employee block header. Exports either put everything in
/// column A (`Employee ID: 102, First Name: Ali, Department: Drivers`) or
/// split the three pairs over columns A/B/C.
pub fn parse_employee_header(row: &[CellValue]) -> Option<EmployeeHeader> {
    let a = cell_text(row, 0);
    let a_lower = a.to_lowercase();

    let is_header = (a_lower.starts_with("employee id") || a_lower.starts_with("employeeid"))
        && a.contains(':');
    if !is_header {
        return None;
    }

    let mut header = EmployeeHeader::default();

    for token in a.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();

        if key.starts_with("employee id") || key.starts_with("employeeid") {
            header.employee_id = value;
        } else if key.starts_with("first name") || key == "name" {
            header.name = Some(value);
        } else if key.starts_with("department") {
            header.department = Some(value);
        }
    }

    if header.name.is_none() {
        header.name = labelled_value(&cell_text(row, 1), "first name");
    }
    if header.department.is_none() {
        header.department = labelled_value(&cell_text(row, 2), "department");
    }

    if header.employee_id.is_empty() {
        return None;
    }

    Some(header)
}

fn labelled_value(cell: &str, label: &str) -> Option<String> {
    let (key, value) = cell.split_once(':')?;
    key.trim()
        .to_lowercase()
        .starts_with(label)
        .then(|| value.trim().to_string())
}

pub fn is_timecard_header(row: &[CellValue]) -> bool {
    cell_text(row, 0).eq_ignore_ascii_case("date")
        && cell_text(row, 1).to_lowercase().starts_with("times")
        && cell_text(row, 2).eq_ignore_ascii_case("time")
}

pub fn is_legacy_header(row: &[CellValue]) -> bool {
    cell_text(row, 0).eq_ignore_ascii_case("date")
        && row
            .iter()
            .skip(1)
            .any(|c| c.text().to_lowercase().contains("punch"))
}

/// Classify the row that follows an employee header.
///
/// A forced mode is returned unchanged. In auto mode the timecard header is
/// tried first, then the legacy header, then a header-less legacy block
/// whose first row already starts with a date.
pub fn detect_format(mode: FormatMode, first_row: &[CellValue]) -> Result<SheetFormat, ProcessError> {
    match mode {
        FormatMode::Legacy => return Ok(SheetFormat::Legacy),
        FormatMode::Timecard => return Ok(SheetFormat::Timecard),
        FormatMode::Auto => {}
    }

    if is_timecard_header(first_row) {
        Ok(SheetFormat::Timecard)
    } else if is_legacy_header(first_row) || first_row.first().and_then(CellValue::as_date).is_some() {
        Ok(SheetFormat::Legacy)
    } else {
        let seen = first_row
            .iter()
            .map(CellValue::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        Err(ProcessError::UnrecognizedFormat {
            detail: format!("unexpected column header '{}'", seen),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::Text(c.to_string())).collect()
    }

    #[test]
    fn header_in_single_cell() {
        let header =
            parse_employee_header(&row(&["Employee ID: 102, First Name: Ali, Department: Driver support"]))
                .unwrap();

        assert_eq!(
            header,
            EmployeeHeader {
                employee_id: "102".into(),
                name: Some("Ali".into()),
                department: Some("Driver support".into()),
            }
        );
    }

    #[test]
    fn header_split_over_columns() {
        let header =
            parse_employee_header(&row(&["Employee ID: 7", "First Name: Sara", "Department: HR"])).unwrap();

        assert_eq!(header.employee_id, "7");
        assert_eq!(header.name.as_deref(), Some("Sara"));
        assert_eq!(header.department.as_deref(), Some("HR"));
    }

    #[test]
    fn ordinary_rows_are_not_headers() {
        assert!(parse_employee_header(&row(&["Date", "Times", "Time"])).is_none());
        assert!(parse_employee_header(&row(&["Employee Name"])).is_none());
        assert!(parse_employee_header(&[]).is_none());
    }

    #[test]
    fn detects_timecard_layout() {
        let format = detect_format(FormatMode::Auto, &row(&["Date", "Times", "Time"])).unwrap();
        assert_eq!(format, SheetFormat::Timecard);
    }

    #[test]
    fn detects_legacy_layout() {
        let with_header =
            detect_format(FormatMode::Auto, &row(&["Date", "Day", "First Punch", "Last Punch"])).unwrap();
        let headerless = detect_format(FormatMode::Auto, &row(&["2024-01-02", "Tue", "08:00", "15:00"])).unwrap();

        assert_eq!(with_header, SheetFormat::Legacy);
        assert_eq!(headerless, SheetFormat::Legacy);
    }

    #[test]
    fn forced_mode_overrides_detection() {
        let timecard_row = row(&["Date", "Times", "Time"]);
        let legacy_row = row(&["Date", "Day", "First Punch", "Last Punch"]);

        assert_eq!(
            detect_format(FormatMode::Legacy, &timecard_row).unwrap(),
            SheetFormat::Legacy
        );
        assert_eq!(
            detect_format(FormatMode::Timecard, &legacy_row).unwrap(),
            SheetFormat::Timecard
        );
        assert_eq!(
            detect_format(FormatMode::Timecard, &row(&["garbage"])).unwrap(),
            SheetFormat::Timecard
        );
    }

    #[test]
    fn unknown_layout_is_rejected() {
        let err = detect_format(FormatMode::Auto, &row(&["Name", "Salary"])).unwrap_err();
        assert!(matches!(err, ProcessError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn format_mode_parses_case_insensitively() {
        assert_eq!(FormatMode::from_str("AUTO").unwrap(), FormatMode::Auto);
        assert_eq!(FormatMode::from_str("timecard").unwrap(), FormatMode::Timecard);
        assert!(FormatMode::from_str("csv").is_err());
    }
}
