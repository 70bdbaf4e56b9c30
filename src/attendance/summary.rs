use chrono::NaiveDate;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::attendance::ProcessingOptions;
use crate::attendance::aggregate::EmployeeBlock;
use crate::attendance::requests::RequestIndex;
use crate::attendance::values::{format_time, round4};
use crate::model::request::RequestKind;

pub const STANDARD_SHIFT_HOURS: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayStatus {
    Present,
    Absent,
    Holiday,
    Special,
}

/// Inclusive span of calendar dates found in the uploaded sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub start: NaiveDate,
    #[schema(example = "2024-01-31", format = "date", value_type = String)]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn len(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub employee_id: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub status: DayStatus,
    /// hours − standard shift on present days, 0 otherwise
    pub overtime_delta: f64,
    pub punch_count: usize,
    pub punches: String,
    pub shifts: usize,
    pub assumed_exit: bool,
    pub is_holiday: bool,
    pub overtime: f64,
    pub delay: f64,
    pub overtime_request: Option<String>,
    pub leave_request: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeSummary {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub days_present: u32,
    pub days_absent: u32,
    pub holiday_days: u32,
    pub special_days: u32,
    pub worked_on_holidays: u32,
    pub extra_days: u32,
    pub shortfall: u32,
    pub total_hours: f64,
    pub total_overtime: f64,
    pub delay_hours: f64,
    pub assumed_exit_days: u32,
    pub requested_overtime_hours: f64,
    pub overtime_requests: u32,
    pub leave_requests: u32,
}

/// One record per calendar date of `range` for the employee of `block`.
pub fn build_day_records(
    block: &EmployeeBlock,
    range: DateRange,
    opts: &ProcessingOptions,
    requests: &RequestIndex,
) -> Vec<DayRecord> {
    let employee_id = block.header.employee_id.as_str();

    range
        .days()
        .map(|date| {
            let day = block.days.get(&date);
            let hours = day.map(|d| d.hours()).unwrap_or(0.0);
            let worked = day.is_some_and(|d| d.worked());
            let is_holiday = opts.holidays.contains(&date);

            let status = if worked {
                DayStatus::Present
            } else if is_holiday {
                DayStatus::Holiday
            } else if opts.special_days.contains(&date) {
                DayStatus::Special
            } else {
                DayStatus::Absent
            };

            let overtime_delta = if worked {
                round4(hours - STANDARD_SHIFT_HOURS)
            } else {
                0.0
            };

            DayRecord {
                employee_id: employee_id.to_string(),
                date,
                hours,
                status,
                overtime_delta,
                punch_count: day.map(|d| d.punches.len()).unwrap_or(0),
                punches: day
                    .map(|d| d.punches.iter().map(|t| format_time(*t)).collect::<Vec<_>>().join(", "))
                    .unwrap_or_default(),
                shifts: day.map(|d| d.entries.len()).unwrap_or(0),
                assumed_exit: day.is_some_and(|d| d.assumed_exit()),
                is_holiday,
                overtime: overtime_delta.max(0.0),
                delay: (-overtime_delta).max(0.0),
                overtime_request: requests
                    .reason(employee_id, RequestKind::Overtime, date)
                    .map(str::to_string),
                leave_request: requests
                    .reason(employee_id, RequestKind::Leave, date)
                    .map(str::to_string),
            }
        })
        .collect()
}

/// Totals of one employee's day records against the configured target.
pub fn summarize(
    block: &EmployeeBlock,
    records: &[DayRecord],
    range: DateRange,
    opts: &ProcessingOptions,
    requests: &RequestIndex,
) -> EmployeeSummary {
    let employee_id = block.header.employee_id.as_str();
    let count = |status: DayStatus| records.iter().filter(|r| r.status == status).count() as u32;

    let days_present = count(DayStatus::Present);
    let holiday_days = count(DayStatus::Holiday);
    let special_days = count(DayStatus::Special);
    let worked_on_holidays = records
        .iter()
        .filter(|r| r.status == DayStatus::Present && r.is_holiday)
        .count() as u32;

    let total_overtime: f64 = if opts.allow_negative_overtime {
        records.iter().map(|r| r.overtime_delta).sum()
    } else {
        records.iter().map(|r| r.overtime).sum()
    };

    // unworked holidays and special days do not count against the target
    let exempt = (holiday_days + special_days) as i64;
    let target = opts.target_days as i64;
    let shortfall = (target - days_present as i64 - exempt).max(0) as u32;
    let extra_days = (days_present as i64 - target).max(0) as u32 + worked_on_holidays;

    let requested_overtime_hours = records
        .iter()
        .filter(|r| r.overtime_request.is_some())
        .map(|r| (r.hours - STANDARD_SHIFT_HOURS).max(0.0))
        .sum::<f64>();

    EmployeeSummary {
        employee_id: employee_id.to_string(),
        name: block.header.name.clone().unwrap_or_default(),
        department: block.header.department.clone().unwrap_or_default(),
        days_present,
        days_absent: count(DayStatus::Absent),
        holiday_days,
        special_days,
        worked_on_holidays,
        extra_days,
        shortfall,
        total_hours: round4(records.iter().map(|r| r.hours).sum()),
        total_overtime: round4(total_overtime),
        delay_hours: round4(records.iter().map(|r| r.delay).sum()),
        assumed_exit_days: records.iter().filter(|r| r.assumed_exit).count() as u32,
        requested_overtime_hours: round4(requested_overtime_hours),
        overtime_requests: requests.count_in_range(employee_id, RequestKind::Overtime, range.start, range.end)
            as u32,
        leave_requests: requests.count_in_range(employee_id, RequestKind::Leave, range.start, range.end) as u32,
    }
}
