use chrono::{Days, NaiveDate, NaiveTime, Timelike};

const SECONDS_PER_DAY: i64 = 24 * 3600;
// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];
const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];

/// A cached cell value as stored in the worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Trimmed display text; integral numbers render without a fraction so
    /// numeric employee ids read back as "102", not "102.0".
    pub fn text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text().is_empty()
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Text(s) => parse_date(s),
            CellValue::Number(n) => date_from_serial(*n),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            CellValue::Text(s) => parse_time(s),
            CellValue::Number(n) => time_from_day_fraction(*n),
            _ => None,
        }
    }
}

/// Cell text at `col`, empty when the row is shorter.
pub fn cell_text(row: &[CellValue], col: usize) -> String {
    row.get(col).map(CellValue::text).unwrap_or_default()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // "2024-01-05 00:00:00" style exports
    s.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }

    s.parse::<f64>().ok().and_then(time_from_day_fraction)
}

/// Excel serial day number (1900 date system) to a calendar date.
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Excel stores times as a fraction of a day; a full datetime serial keeps
/// the time in its fractional part.
fn time_from_day_fraction(value: f64) -> Option<NaiveTime> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let fraction = if value >= 1.0 { value.fract() } else { value };
    let seconds = ((fraction * SECONDS_PER_DAY as f64).round() as i64).rem_euclid(SECONDS_PER_DAY);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)
}

/// Hours from `start` to `end`, wrapping past midnight when `end` is earlier.
pub fn hours_between(start: NaiveTime, end: NaiveTime) -> f64 {
    let mut seconds = end.signed_duration_since(start).num_seconds();
    if seconds < 0 {
        seconds += SECONDS_PER_DAY;
    }
    round4(seconds as f64 / 3600.0)
}

pub fn minutes_apart(a: NaiveTime, b: NaiveTime) -> f64 {
    b.signed_duration_since(a).num_seconds().abs() as f64 / 60.0
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn format_time(t: NaiveTime) -> String {
    format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
}
