//! Contact reports: date/status/employee filtering and summary statistics.
//!
//! Everything here is a pure derivation over the rows returned by
//! [`SalesDb::list_contacts_for_employee`], except [`build_report`] which
//! performs that fetch for the signed-in session.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

use crate::auth::Session;
use crate::db::{Contact, ContactStatus, SalesDb, StoreError};

/// Days covered by the default report window and the `Last30Days` preset.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Quick date-range presets offered next to the custom range pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuickPeriod {
    Custom,
    Today,
    ThisWeek,
    ThisMonth,
    Last30Days,
}

impl QuickPeriod {
    pub fn all() -> &'static [QuickPeriod] {
        &[
            QuickPeriod::Custom,
            QuickPeriod::Today,
            QuickPeriod::ThisWeek,
            QuickPeriod::ThisMonth,
            QuickPeriod::Last30Days,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickPeriod::Custom => "Custom Range",
            QuickPeriod::Today => "Today",
            QuickPeriod::ThisWeek => "This Week",
            QuickPeriod::ThisMonth => "This Month",
            QuickPeriod::Last30Days => "Last 30 Days",
        }
    }

    /// Concrete `(start, end)` dates for this preset, both inclusive and
    /// ending today. `Custom` leaves the current range alone.
    pub fn range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = match self {
            QuickPeriod::Custom => return None,
            QuickPeriod::Today => today,
            QuickPeriod::ThisWeek => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            QuickPeriod::ThisMonth => today.with_day(1).unwrap_or(today),
            QuickPeriod::Last30Days => today - Duration::days(DEFAULT_WINDOW_DAYS),
        };
        Some((start, today))
    }
}

impl fmt::Display for QuickPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuickPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuickPeriod::all()
            .iter()
            .find(|p| p.label() == s)
            .copied()
            .ok_or_else(|| format!("unknown period {s:?}"))
    }
}

/// Report filter. Dates are inclusive and compared on the calendar date only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// `None` means all statuses.
    pub status: Option<ContactStatus>,
    /// Narrow to one employee. Honoured for managers only.
    pub employee_id: Option<i64>,
}

impl ReportFilter {
    /// The initial report window: the last 30 days through `today`, any status.
    pub fn default_window(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(DEFAULT_WINDOW_DAYS),
            end: today,
            status: None,
            employee_id: None,
        }
    }

    /// Apply a quick period to the date range, keeping the other criteria.
    pub fn with_period(mut self, period: QuickPeriod, today: NaiveDate) -> Self {
        if let Some((start, end)) = period.range(today) {
            self.start = start;
            self.end = end;
        }
        self
    }

    pub fn matches(&self, contact: &Contact, is_manager: bool) -> bool {
        let day = contact.contact_datetime.date();
        if day < self.start || day > self.end {
            return false;
        }
        if let Some(status) = self.status {
            if contact.status != status {
                return false;
            }
        }
        match self.employee_id {
            Some(id) if is_manager => contact.employee_id == id,
            _ => true,
        }
    }
}

/// Keep the contacts that pass `filter`.
pub fn filter_contacts(
    contacts: Vec<Contact>,
    filter: &ReportFilter,
    is_manager: bool,
) -> Vec<Contact> {
    contacts
        .into_iter()
        .filter(|c| filter.matches(c, is_manager))
        .collect()
}

/// Summary line under the report table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    /// Mean of the ratings that are present; 0 when none are.
    pub average_rating: f64,
    /// Percentage of contacts with status `Completed`; 0 for an empty set.
    pub completion_rate: f64,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Contacts: {} | Average Rating: {:.1} | Completion Rate: {:.1}%",
            self.total, self.average_rating, self.completion_rate
        )
    }
}

pub fn summarize(contacts: &[Contact]) -> ReportSummary {
    let total = contacts.len();

    let (rating_sum, rated) = contacts
        .iter()
        .filter_map(|c| c.conversion_rating)
        .fold((0u32, 0u32), |(sum, n), r| (sum + r as u32, n + 1));
    let average_rating = if rated == 0 {
        0.0
    } else {
        rating_sum as f64 / rated as f64
    };

    let completed = contacts
        .iter()
        .filter(|c| c.status == ContactStatus::Completed)
        .count();
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    ReportSummary {
        total,
        average_rating,
        completion_rate,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReport {
    pub filter: ReportFilter,
    pub rows: Vec<Contact>,
    pub summary: ReportSummary,
}

/// Fetch the session's visible contacts from `filter.start` onward, then
/// filter and summarize them.
pub fn build_report(
    db: &SalesDb,
    session: &Session,
    filter: &ReportFilter,
) -> Result<ContactReport, StoreError> {
    let is_manager = session.is_manager();
    let since = filter.start.and_hms_opt(0, 0, 0);
    let contacts = db.list_contacts_for_employee(session.employee_id(), is_manager, since)?;
    let rows = filter_contacts(contacts, filter, is_manager);
    let summary = summarize(&rows);
    log::debug!(
        "Report {}..{} for employee {}: {} rows",
        filter.start,
        filter.end,
        session.employee_id(),
        rows.len()
    );
    Ok(ContactReport {
        filter: filter.clone(),
        rows,
        summary,
    })
}

/// Today's date on the local clock, the reference for quick periods.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
