use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::db::ExpenseDraft;
use crate::error::{ExpenseServerError, Result};

/// Raw expense body. Fields stay untyped so a wrong type is reported with
/// the same error as an empty value, in the fixed check order.
#[derive(Debug, Default, Deserialize)]
pub struct ExpensePayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub comment: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Four-digit years only.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

fn non_empty_string(value: &Option<Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn parse_amount(value: &Option<Value>) -> Option<f64> {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

fn is_blank(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Accepts RFC 3339, naive date-times (taken as UTC), plain dates, and
/// epoch milliseconds, within years 1 to 9999.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    parse_any_date(value).filter(|date| YEARS.contains(&date.year()))
}

fn parse_any_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(date) = DateTime::parse_from_rfc3339(s) {
                return Some(date.with_timezone(&Utc));
            }
            for format in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

/// First failing check wins: description, comment, amount, date presence,
/// date format.
pub fn validate_expense(payload: &ExpensePayload) -> Result<ExpenseDraft> {
    let description =
        non_empty_string(&payload.description).ok_or(ExpenseServerError::DescriptionEmpty)?;
    let comment = non_empty_string(&payload.comment).ok_or(ExpenseServerError::CommentEmpty)?;
    let amount = parse_amount(&payload.amount).ok_or(ExpenseServerError::AmountInvalid)?;

    if is_blank(&payload.date) {
        return Err(ExpenseServerError::DateEmpty);
    }
    let date = payload
        .date
        .as_ref()
        .and_then(parse_date)
        .ok_or(ExpenseServerError::DateInvalid)?;

    Ok(ExpenseDraft {
        description: description.to_string(),
        comment: comment.to_string(),
        amount,
        date,
    })
}
