//! Condition operators.
//!
//! The [`Operator`] enum names every operator a condition may carry, grouped
//! by the condition types that understand them. Which operators a given
//! condition type accepts is decided by its evaluator; an operator that is
//! valid here but meaningless for the type simply contributes nothing.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownOperator;

/// Operator of a rule condition.
///
/// Operators are grouped by the conditions they serve:
/// - **Membership**: `Equals`, `NotEquals`, `In`, `NotIn`, `Any`, `All`
/// - **Text**: `Contains`
/// - **Date, no value**: `IsToday`, `IsNull`, `IsNotNull`, `IsOverdue`,
///   `ThisWeek`, `NextWeek`, `ThisMonth`, `Yesterday`, `Tomorrow`
/// - **Date, day count**: `OverdueBy*`, `DueIn*`, `*DaysAgo`, `Within*`, `Starts*`
/// - **Date, explicit**: `On`, `Before`, `After`, `Between`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Membership operators
    Equals,
    NotEquals,
    In,
    NotIn,
    /// Node carries at least one of the tags.
    Any,
    /// Node carries every one of the tags.
    All,

    // Text operators
    /// Case-insensitive literal substring.
    Contains,

    // Date operators without values
    IsToday,
    IsNull,
    IsNotNull,
    /// Due before the start of today.
    IsOverdue,
    ThisWeek,
    NextWeek,
    ThisMonth,
    Yesterday,
    Tomorrow,

    // Date operators taking a day count
    OverdueByDays,
    OverdueByMoreThan,
    OverdueByLessThan,
    DueInDays,
    DueWithinDays,
    DueInMoreThanDays,
    WithinLastDays,
    MoreThanDaysAgo,
    ExactlyDaysAgo,
    WithinNextDays,
    StartsWithinDays,
    StartsInMoreThanDays,

    // Date operators taking explicit dates
    On,
    Before,
    After,
    Between,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 32] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::In,
        Operator::NotIn,
        Operator::Any,
        Operator::All,
        Operator::Contains,
        Operator::IsToday,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::IsOverdue,
        Operator::ThisWeek,
        Operator::NextWeek,
        Operator::ThisMonth,
        Operator::Yesterday,
        Operator::Tomorrow,
        Operator::OverdueByDays,
        Operator::OverdueByMoreThan,
        Operator::OverdueByLessThan,
        Operator::DueInDays,
        Operator::DueWithinDays,
        Operator::DueInMoreThanDays,
        Operator::WithinLastDays,
        Operator::MoreThanDaysAgo,
        Operator::ExactlyDaysAgo,
        Operator::WithinNextDays,
        Operator::StartsWithinDays,
        Operator::StartsInMoreThanDays,
        Operator::On,
        Operator::Before,
        Operator::After,
        Operator::Between,
    ];

    /// Returns `true` if this operator needs no `values`.
    pub fn is_no_value_op(self) -> bool {
        matches!(
            self,
            Operator::IsToday
                | Operator::IsNull
                | Operator::IsNotNull
                | Operator::IsOverdue
                | Operator::ThisWeek
                | Operator::NextWeek
                | Operator::ThisMonth
                | Operator::Yesterday
                | Operator::Tomorrow
        )
    }

    /// Returns `true` if this operator reads a day count from `values[0]`.
    pub fn is_day_count_op(self) -> bool {
        matches!(
            self,
            Operator::OverdueByDays
                | Operator::OverdueByMoreThan
                | Operator::OverdueByLessThan
                | Operator::DueInDays
                | Operator::DueWithinDays
                | Operator::DueInMoreThanDays
                | Operator::WithinLastDays
                | Operator::MoreThanDaysAgo
                | Operator::ExactlyDaysAgo
                | Operator::WithinNextDays
                | Operator::StartsWithinDays
                | Operator::StartsInMoreThanDays
        )
    }

    /// Returns `true` if this operator reads explicit dates from `values`.
    pub fn is_explicit_date_op(self) -> bool {
        matches!(
            self,
            Operator::On | Operator::Before | Operator::After | Operator::Between
        )
    }

    /// Returns `true` if this operator is valid for date conditions.
    pub fn is_date_op(self) -> bool {
        self.is_no_value_op() || self.is_day_count_op() || self.is_explicit_date_op()
    }

    /// Returns `true` if this operator only makes sense against a due date.
    pub fn is_overdue_op(self) -> bool {
        matches!(
            self,
            Operator::IsOverdue
                | Operator::OverdueByDays
                | Operator::OverdueByMoreThan
                | Operator::OverdueByLessThan
        )
    }

    /// Returns the wire name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Any => "any",
            Operator::All => "all",
            Operator::Contains => "contains",
            Operator::IsToday => "is_today",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::IsOverdue => "is_overdue",
            Operator::ThisWeek => "this_week",
            Operator::NextWeek => "next_week",
            Operator::ThisMonth => "this_month",
            Operator::Yesterday => "yesterday",
            Operator::Tomorrow => "tomorrow",
            Operator::OverdueByDays => "overdue_by_days",
            Operator::OverdueByMoreThan => "overdue_by_more_than",
            Operator::OverdueByLessThan => "overdue_by_less_than",
            Operator::DueInDays => "due_in_days",
            Operator::DueWithinDays => "due_within_days",
            Operator::DueInMoreThanDays => "due_in_more_than_days",
            Operator::WithinLastDays => "within_last_days",
            Operator::MoreThanDaysAgo => "more_than_days_ago",
            Operator::ExactlyDaysAgo => "exactly_days_ago",
            Operator::WithinNextDays => "within_next_days",
            Operator::StartsWithinDays => "starts_within_days",
            Operator::StartsInMoreThanDays => "starts_in_more_than_days",
            Operator::On => "on",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::Between => "between",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// Returns `true` if a raw operator string needs no `values`.
///
/// Unknown operators are treated as needing values.
pub fn is_no_value_operator(raw: &str) -> bool {
    raw.parse::<Operator>()
        .map(Operator::is_no_value_op)
        .unwrap_or(false)
}
