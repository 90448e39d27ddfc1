//! Calendar windows for date conditions.
//!
//! Every date operator reduces to a [`DateTest`]: a null check or a
//! [`Window`] of instants. Windows are computed from a [`Calendar`] anchored
//! on the calendar date of "now" in UTC, so an evaluation that captures now
//! once sees one consistent today.
//!
//! A day is the half-open window `[00:00, next 00:00)` UTC. Weeks start on
//! Monday. Day-count operators read `values[0]` as a signed integer.

use std::ops::{Bound, RangeBounds};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tasktree_model::TaskFacet;

use crate::op::Operator;

/// The task date a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    /// `due_at`
    Due,
    /// `earliest_start_at`
    EarliestStart,
}

impl DateField {
    pub fn as_str(self) -> &'static str {
        match self {
            DateField::Due => "due_at",
            DateField::EarliestStart => "earliest_start_at",
        }
    }

    pub fn read(self, task: &TaskFacet) -> Option<DateTime<Utc>> {
        match self {
            DateField::Due => task.due_at,
            DateField::EarliestStart => task.earliest_start_at,
        }
    }
}

/// A contiguous range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Bound<DateTime<Utc>>,
    pub end: Bound<DateTime<Utc>>,
}

impl Window {
    pub fn new(start: Bound<DateTime<Utc>>, end: Bound<DateTime<Utc>>) -> Self {
        Window { start, end }
    }

    /// Half-open `[start, end)`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Window::new(Bound::Included(start), Bound::Excluded(end))
    }

    /// Everything strictly earlier than `instant`.
    pub fn before(instant: DateTime<Utc>) -> Self {
        Window::new(Bound::Unbounded, Bound::Excluded(instant))
    }

    /// Everything strictly later than `instant`.
    pub fn after(instant: DateTime<Utc>) -> Self {
        Window::new(Bound::Excluded(instant), Bound::Unbounded)
    }

    /// `instant` and everything later.
    pub fn starting(instant: DateTime<Utc>) -> Self {
        Window::new(Bound::Included(instant), Bound::Unbounded)
    }

    /// The whole calendar day.
    pub fn day(date: NaiveDate) -> Option<Self> {
        Some(Window::between(start_of(date), start_of(date.succ_opt()?)))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        (self.start, self.end).contains(&instant)
    }
}

/// What a date condition asks of a task's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTest {
    IsNull,
    IsNotNull,
    /// The date is present and inside the window.
    Within(Window),
}

impl DateTest {
    pub fn matches(&self, value: Option<DateTime<Utc>>) -> bool {
        match (self, value) {
            (DateTest::IsNull, value) => value.is_none(),
            (DateTest::IsNotNull, value) => value.is_some(),
            (DateTest::Within(window), Some(instant)) => window.contains(instant),
            (DateTest::Within(_), None) => false,
        }
    }
}

/// Midnight UTC at the start of `date`.
pub fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// A parsed explicit date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateValue {
    pub instant: DateTime<Utc>,
    /// Calendar day as written, before any offset is applied.
    pub local_date: NaiveDate,
    /// The input named a day without a time.
    pub date_only: bool,
}

/// Parses an explicit date.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC, `T` or
/// space separated) or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_date_value(input: &str) -> Option<DateValue> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(DateValue {
            instant: value.with_timezone(&Utc),
            local_date: value.date_naive(),
            date_only: false,
        });
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(DateValue {
                instant: value.and_utc(),
                local_date: value.date(),
                date_only: false,
            });
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| DateValue {
            instant: start_of(date),
            local_date: date,
            date_only: true,
        })
}

/// Calendar arithmetic relative to a fixed today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    today: NaiveDate,
}

impl Calendar {
    /// Anchors the calendar on the UTC date of `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Calendar {
            today: now.date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Today shifted by a signed number of days.
    pub fn offset(&self, days: i64) -> Option<NaiveDate> {
        if days >= 0 {
            self.today.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.today.checked_sub_days(Days::new(days.unsigned_abs()))
        }
    }

    fn start(&self, days: i64) -> Option<DateTime<Utc>> {
        self.offset(days).map(start_of)
    }

    /// The calendar day `days` away from today.
    pub fn day(&self, days: i64) -> Option<Window> {
        Window::day(self.offset(days)?)
    }

    /// Monday to Sunday, `weeks_ahead` weeks from the current one.
    pub fn week(&self, weeks_ahead: u64) -> Option<Window> {
        let monday = self
            .today
            .checked_sub_days(Days::new(u64::from(self.today.weekday().num_days_from_monday())))?
            .checked_add_days(Days::new(weeks_ahead.checked_mul(7)?))?;
        let next_monday = monday.checked_add_days(Days::new(7))?;
        Some(Window::between(start_of(monday), start_of(next_monday)))
    }

    /// The current calendar month.
    pub fn month(&self) -> Option<Window> {
        let first = self.today.with_day(1)?;
        let next = first.checked_add_months(Months::new(1))?;
        Some(Window::between(start_of(first), start_of(next)))
    }

    /// Translates an operator and its values into a test.
    ///
    /// Returns `None` when the operator is not a date operator or its values
    /// do not parse. Whether an overdue operator applies to the field being
    /// tested is the caller's concern.
    pub fn test(&self, op: Operator, values: &[String]) -> Option<DateTest> {
        let window = match op {
            Operator::IsNull => return Some(DateTest::IsNull),
            Operator::IsNotNull => return Some(DateTest::IsNotNull),
            Operator::IsToday => self.day(0)?,
            Operator::Yesterday => self.day(-1)?,
            Operator::Tomorrow => self.day(1)?,
            Operator::IsOverdue => Window::before(self.start(0)?),
            Operator::ThisWeek => self.week(0)?,
            Operator::NextWeek => self.week(1)?,
            Operator::ThisMonth => self.month()?,
            op if op.is_day_count_op() => self.day_count_window(op, day_count(values)?)?,
            op if op.is_explicit_date_op() => explicit_window(op, values)?,
            _ => return None,
        };
        Some(DateTest::Within(window))
    }

    fn day_count_window(&self, op: Operator, n: i64) -> Option<Window> {
        let ago = n.checked_neg()?;
        let window = match op {
            Operator::OverdueByDays | Operator::ExactlyDaysAgo => self.day(ago)?,
            // Overdue by at least n days: due any time up to the end of day today-n.
            Operator::OverdueByMoreThan => Window::before(self.start(ago.checked_add(1)?)?),
            Operator::OverdueByLessThan => Window::between(self.start(ago)?, self.start(0)?),
            Operator::DueInDays => self.day(n)?,
            Operator::DueWithinDays | Operator::WithinNextDays | Operator::StartsWithinDays => {
                Window::between(self.start(0)?, self.start(n.checked_add(1)?)?)
            }
            Operator::DueInMoreThanDays | Operator::StartsInMoreThanDays => {
                Window::starting(self.start(n.checked_add(1)?)?)
            }
            Operator::WithinLastDays => Window::between(self.start(ago)?, self.start(1)?),
            Operator::MoreThanDaysAgo => Window::before(self.start(ago)?),
            _ => return None,
        };
        Some(window)
    }
}

fn day_count(values: &[String]) -> Option<i64> {
    values.first()?.trim().parse().ok()
}

fn explicit_window(op: Operator, values: &[String]) -> Option<Window> {
    let first = parse_date_value(values.first()?)?;
    let window = match op {
        Operator::On => Window::day(first.local_date)?,
        Operator::Before => Window::before(first.instant),
        Operator::After => Window::after(first.instant),
        Operator::Between => {
            let last = parse_date_value(values.get(1)?)?;
            let end = if last.date_only {
                Bound::Excluded(start_of(last.instant.date_naive().succ_opt()?))
            } else {
                Bound::Included(last.instant)
            };
            Window::new(Bound::Included(first.instant), end)
        }
        _ => return None,
    };
    Some(window)
}
