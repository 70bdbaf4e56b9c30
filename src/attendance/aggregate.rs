//! Turns the raw rows of each employee block into per-date shifts.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::attendance::ProcessingOptions;
use crate::attendance::detect::{
    EmployeeHeader, SheetFormat, detect_format, is_timecard_header, parse_employee_header,
};
use crate::attendance::error::ProcessError;
use crate::attendance::sheet::Row;
use crate::attendance::values::{CellValue, cell_text, hours_between, minutes_apart, parse_time, round4};

/// One worked shift. `time_out` is `None` when the exit punch was missing
/// and `hours` holds the assumed duration instead.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub employee_id: String,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_out: Option<NaiveTime>,
    pub hours: f64,
}

impl TimeEntry {
    fn closed(employee_id: &str, date: NaiveDate, time_in: NaiveTime, time_out: NaiveTime) -> Self {
        TimeEntry {
            employee_id: employee_id.to_string(),
            date,
            time_in,
            time_out: Some(time_out),
            hours: hours_between(time_in, time_out),
        }
    }

    fn assumed(employee_id: &str, date: NaiveDate, time_in: NaiveTime, hours: f64) -> Self {
        TimeEntry {
            employee_id: employee_id.to_string(),
            date,
            time_in,
            time_out: None,
            hours,
        }
    }

    pub fn is_assumed_exit(&self) -> bool {
        self.time_out.is_none()
    }
}

/// Punches and resolved shifts for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkDay {
    pub date: NaiveDate,
    pub punches: Vec<NaiveTime>,
    pub entries: Vec<TimeEntry>,
}

impl WorkDay {
    fn new(date: NaiveDate) -> Self {
        WorkDay {
            date,
            punches: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn hours(&self) -> f64 {
        round4(self.entries.iter().map(|e| e.hours).sum())
    }

    pub fn worked(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn assumed_exit(&self) -> bool {
        self.entries.iter().any(TimeEntry::is_assumed_exit)
    }
}

#[derive(Debug, Clone)]
pub struct EmployeeBlock {
    pub header: EmployeeHeader,
    pub format: SheetFormat,
    pub days: BTreeMap<NaiveDate, WorkDay>,
}

impl EmployeeBlock {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    /// Merge a later block of the same employee into this one.
    fn absorb(&mut self, other: EmployeeBlock) {
        for (date, day) in other.days {
            let target = self.days.entry(date).or_insert_with(|| WorkDay::new(date));
            target.punches.extend(day.punches);
            target.entries.extend(day.entries);
        }
    }
}

/// Split the sheet at every employee header and parse each block with the
/// layout detected from (or forced for) its first non-blank row. Blocks
/// without any row are skipped.
pub fn parse_blocks(rows: &[Row], opts: &ProcessingOptions) -> Result<Vec<EmployeeBlock>, ProcessError> {
    let headers: Vec<(usize, EmployeeHeader)> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| parse_employee_header(row).map(|h| (idx, h)))
        .collect();

    tracing::debug!(employees = headers.len(), rows = rows.len(), "Employee headers located");

    let mut blocks: Vec<EmployeeBlock> = Vec::with_capacity(headers.len());

    for (n, (start, header)) in headers.iter().enumerate() {
        let end = headers.get(n + 1).map(|(idx, _)| *idx).unwrap_or(rows.len());
        let body = &rows[start + 1..end];

        let Some(first) = body.iter().find(|row| !row.iter().all(CellValue::is_blank)) else {
            tracing::warn!(employee_id = %header.employee_id, row = start + 1, "Employee block has no rows");
            continue;
        };

        let format = detect_format(opts.format, first)?;
        let block = match format {
            SheetFormat::Legacy => legacy_block(header.clone(), body, opts),
            SheetFormat::Timecard => timecard_block(header.clone(), body, opts),
        };

        tracing::debug!(
            employee_id = %block.header.employee_id,
            format = %format,
            days = block.days.len(),
            "Employee block parsed"
        );

        match blocks
            .iter_mut()
            .find(|b| b.header.employee_id == block.header.employee_id)
        {
            Some(existing) => existing.absorb(block),
            None => blocks.push(block),
        }
    }

    Ok(blocks)
}

// ---------- legacy: Date | Day | First Punch | Last Punch ----------

fn legacy_block(header: EmployeeHeader, body: &[Row], opts: &ProcessingOptions) -> EmployeeBlock {
    let mut days: BTreeMap<NaiveDate, WorkDay> = BTreeMap::new();

    for row in body {
        if cell_text(row, 0).eq_ignore_ascii_case("date") {
            continue;
        }
        let Some(date) = row.first().and_then(CellValue::as_date) else {
            continue;
        };

        let first_punch = row.get(2).and_then(CellValue::as_time);
        let last_punch = row.get(3).and_then(CellValue::as_time);

        let day = days.entry(date).or_insert_with(|| WorkDay::new(date));
        day.punches.extend(first_punch.into_iter().chain(last_punch));

        match (first_punch, last_punch) {
            // an exit earlier than the entry is an overnight shift of this date
            (Some(time_in), Some(time_out)) => day
                .entries
                .push(TimeEntry::closed(&header.employee_id, date, time_in, time_out)),
            (Some(time_in), None) => day.entries.push(TimeEntry::assumed(
                &header.employee_id,
                date,
                time_in,
                opts.assume_missing_exit_hours,
            )),
            _ => {}
        }
    }

    EmployeeBlock {
        header,
        format: SheetFormat::Legacy,
        days,
    }
}

// ---------- timecard: Date | Times | Time (comma-separated punches) ----------

fn timecard_block(header: EmployeeHeader, body: &[Row], opts: &ProcessingOptions) -> EmployeeBlock {
    let mut punches: BTreeMap<NaiveDate, Vec<NaiveTime>> = BTreeMap::new();

    for row in body {
        if is_timecard_header(row) {
            continue;
        }
        let Some(date) = row.first().and_then(CellValue::as_date) else {
            continue;
        };

        punches.entry(date).or_default().extend(row_punches(row.get(2)));
    }

    for times in punches.values_mut() {
        times.sort();
    }

    apply_cutoff(&mut punches, opts);

    let mut days = BTreeMap::new();
    for (date, times) in punches {
        let kept = drop_near_duplicates(&times, opts.dup_threshold_minutes);
        let mut day = WorkDay::new(date);

        let mut pairs = kept.chunks_exact(2);
        for pair in pairs.by_ref() {
            day.entries
                .push(TimeEntry::closed(&header.employee_id, date, pair[0], pair[1]));
        }
        // a lone trailing punch after the cutoff is an entry whose exit is missing
        if let [last] = pairs.remainder() {
            if last.hour() >= opts.cutoff_hour {
                day.entries.push(TimeEntry::assumed(
                    &header.employee_id,
                    date,
                    *last,
                    opts.assume_missing_exit_hours,
                ));
            }
        }

        day.punches = kept;
        days.insert(date, day);
    }

    EmployeeBlock {
        header,
        format: SheetFormat::Timecard,
        days,
    }
}

fn row_punches(cell: Option<&CellValue>) -> Vec<NaiveTime> {
    match cell {
        Some(CellValue::Text(list)) => list.split(',').filter_map(parse_time).collect(),
        Some(value) => value.as_time().into_iter().collect(),
        None => Vec::new(),
    }
}

/// Punches before the cutoff hour at the start of a day close the previous
/// day's night shift. Near-duplicate early punches collapse to the earliest
/// first; the remaining early punch moves to the end of the previous
/// calendar day, or is dropped when that day has no punches.
fn apply_cutoff(punches: &mut BTreeMap<NaiveDate, Vec<NaiveTime>>, opts: &ProcessingOptions) {
    let cutoff = opts.cutoff_hour;
    let threshold = opts.dup_threshold_minutes as f64;
    let dates: Vec<NaiveDate> = punches.keys().copied().collect();

    for date in dates {
        let early = {
            let Some(times) = punches.get_mut(&date) else {
                continue;
            };
            while times.len() >= 2
                && times[0].hour() < cutoff
                && times[1].hour() < cutoff
                && minutes_apart(times[0], times[1]) < threshold
            {
                times.remove(1);
            }
            if times.first().is_some_and(|t| t.hour() < cutoff) {
                Some(times.remove(0))
            } else {
                None
            }
        };

        let Some(early) = early else {
            continue;
        };

        let previous = date
            .pred_opt()
            .and_then(|prev| punches.get_mut(&prev))
            .filter(|times| !times.is_empty());

        match previous {
            Some(times) => times.push(early),
            None => tracing::debug!(%date, punch = %early, "Early punch without a previous day dropped"),
        }
    }
}

/// Keep a punch only if it is at least `threshold_minutes` away from the
/// last kept one; the older punch wins.
fn drop_near_duplicates(times: &[NaiveTime], threshold_minutes: u32) -> Vec<NaiveTime> {
    let mut kept: Vec<NaiveTime> = Vec::with_capacity(times.len());
    for &t in times {
        match kept.last() {
            Some(&prev) if minutes_apart(prev, t) < threshold_minutes as f64 => {}
            _ => kept.push(t),
        }
    }
    kept
}
