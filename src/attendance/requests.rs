use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::model::request::{Request, RequestKind, RequestStatus};

#[derive(Debug, Clone, Default)]
struct EmployeeRequests {
    overtime: BTreeMap<NaiveDate, String>,
    leave: BTreeMap<NaiveDate, String>,
}

impl EmployeeRequests {
    fn of_kind(&self, kind: RequestKind) -> &BTreeMap<NaiveDate, String> {
        match kind {
            RequestKind::Overtime => &self.overtime,
            RequestKind::Leave => &self.leave,
        }
    }
}

/// Active overtime/leave requests keyed by employee id and date.
///
/// Only the first request per employee, kind and date is kept; its reason is
/// the one shown on the daily report.
#[derive(Debug, Clone, Default)]
pub struct RequestIndex {
    by_employee: HashMap<String, EmployeeRequests>,
}

impl RequestIndex {
    pub fn from_requests<'a>(requests: impl IntoIterator<Item = &'a Request>) -> Self {
        let mut index = RequestIndex::default();
        for req in requests {
            if req.status == RequestStatus::Active {
                index.insert(&req.employee_id, req.kind, req.date, &req.reason);
            }
        }
        index
    }

    pub fn insert(&mut self, employee_id: &str, kind: RequestKind, date: NaiveDate, reason: &str) {
        let entry = self
            .by_employee
            .entry(employee_id.trim().to_string())
            .or_default();
        let dates = match kind {
            RequestKind::Overtime => &mut entry.overtime,
            RequestKind::Leave => &mut entry.leave,
        };
        dates.entry(date).or_insert_with(|| reason.to_string());
    }

    /// Reason of the request on `date`, `None` when there is none.
    pub fn reason(&self, employee_id: &str, kind: RequestKind, date: NaiveDate) -> Option<&str> {
        self.by_employee
            .get(employee_id)
            .and_then(|e| e.of_kind(kind).get(&date))
            .map(String::as_str)
    }

    /// Number of request dates of `kind` for one employee within `[from, to]`.
    pub fn count_in_range(&self, employee_id: &str, kind: RequestKind, from: NaiveDate, to: NaiveDate) -> usize {
        self.by_employee
            .get(employee_id)
            .map(|e| e.of_kind(kind).range(from..=to).count())
            .unwrap_or(0)
    }

    /// Same as [`count_in_range`](Self::count_in_range) across all employees.
    pub fn total_in_range(&self, kind: RequestKind, from: NaiveDate, to: NaiveDate) -> usize {
        self.by_employee
            .values()
            .map(|e| e.of_kind(kind).range(from..=to).count())
            .sum()
    }
}
