//! Weekly grouping of a user's expenses.
//!
//! Weeks start on Sunday at 00:00 UTC and end on the following Saturday.
//! An expense whose week falls outside the calendar range is left out.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::db::Expense;

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total: f64,
    pub items: usize,
    pub expenses: Vec<Expense>,
}

pub fn week_start(date: &DateTime<Utc>) -> Option<NaiveDate> {
    let day = date.date_naive();
    day.checked_sub_signed(Duration::days(i64::from(
        day.weekday().num_days_from_sunday(),
    )))
}

fn week_bounds(date: &DateTime<Utc>) -> Option<(NaiveDate, NaiveDate)> {
    let start = week_start(date)?;
    Some((start, start.checked_add_signed(Duration::days(6))?))
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

pub fn weekly_summary(expenses: Vec<Expense>) -> Vec<WeekSummary> {
    let mut weeks: BTreeMap<(NaiveDate, NaiveDate), Vec<Expense>> = BTreeMap::new();
    for expense in expenses {
        match week_bounds(&expense.date) {
            Some(bounds) => weeks.entry(bounds).or_default().push(expense),
            None => log::warn!(
                "Skipping expense {:?} dated {} outside the calendar range",
                expense.id,
                expense.date
            ),
        }
    }

    weeks
        .into_iter()
        .map(|((start, end), mut expenses)| {
            expenses.sort_by_key(|expense| expense.date);
            let total: f64 = expenses.iter().map(|expense| expense.amount).sum();

            WeekSummary {
                start: midnight(start),
                end: midnight(end),
                total,
                items: expenses.len(),
                expenses,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expense(day: u32, hour: u32, amount: f64) -> Expense {
        Expense {
            id: None,
            owner: "alice".to_string(),
            description: format!("day {}", day),
            comment: "test".to_string(),
            amount,
            date: Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_week_start_is_sunday() {
        // 2024-06-09 is a Sunday, 2024-06-15 a Saturday
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();

        assert_eq!(week_start(&expense(9, 0, 1.0).date), Some(sunday));
        assert_eq!(week_start(&expense(15, 23, 1.0).date), Some(sunday));
        assert_eq!(
            week_start(&expense(16, 0, 1.0).date),
            NaiveDate::from_ymd_opt(2024, 6, 16)
        );
    }

    #[test]
    fn test_groups_by_week_in_order() {
        let summary = weekly_summary(vec![
            expense(17, 9, 10.0),
            expense(12, 9, 5.0),
            expense(10, 9, 9.0),
            expense(15, 22, 7.0),
        ]);

        assert_eq!(summary.len(), 2);

        let first = &summary[0];
        assert_eq!(first.start, Utc.with_ymd_and_hms(2024, 6, 9, 0, 0, 0).unwrap());
        assert_eq!(first.end, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        assert_eq!(first.items, 3);
        assert_eq!(first.total, 21.0);
        assert_eq!(first.expenses[0].description, "day 10");
        assert_eq!(first.expenses[2].description, "day 15");

        let second = &summary[1];
        assert_eq!(second.items, 1);
        assert_eq!(second.total, 10.0);
    }

    #[test]
    fn test_week_past_calendar_end_is_skipped() {
        let last_day = NaiveDate::MAX.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let mut edge = expense(10, 9, 3.0);
        edge.date = last_day;

        // The final calendar week has no representable Saturday
        let summary = weekly_summary(vec![edge, expense(12, 9, 5.0)]);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total, 5.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(weekly_summary(Vec::new()).is_empty());
    }
}
