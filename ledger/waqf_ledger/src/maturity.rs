//! Time/maturity calculator.
//!
//! Pure functions over [`Timestamp`]s. `now` is always passed in; nothing here
//! reads the clock.

use chrono::Months;

use crate::timestamp::{Timestamp, MILLIS_PER_DAY};

const DAYS_PER_MONTH: i64 = 30;
const MONTHS_PER_YEAR: i64 = 12;

/// Whole days until `maturity`, rounded up. Zero or negative once matured.
pub fn days_until(maturity: Timestamp, now: Timestamp) -> i64 {
    let diff = maturity.millis_since(now);
    let days = diff.div_euclid(MILLIS_PER_DAY);
    if diff.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Inclusive: a tranche is matured at exactly its maturity instant.
pub fn is_matured(maturity: Timestamp, now: Timestamp) -> bool {
    now >= maturity
}

/// `start + lock_period_months` calendar months.
///
/// Month overflow clamps to the last day of the target month
/// (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year). Returns `None` when
/// the result leaves chrono's representable range.
pub fn compute_maturity_date(lock_period_months: u32, start: Timestamp) -> Option<Timestamp> {
    start
        .to_datetime()?
        .checked_add_months(Months::new(lock_period_months))
        .map(Timestamp::from_datetime)
}

/// Elapsed share of the lock period, in percent, clamped to `[0, 100]`.
///
/// A zero-length period is 100 once `now >= start`, otherwise 0.
pub fn maturity_progress(start: Timestamp, maturity: Timestamp, now: Timestamp) -> f64 {
    let total = maturity.millis_since(start);
    if total <= 0 {
        return if now >= start { 100.0 } else { 0.0 };
    }
    let elapsed = now.millis_since(start) as f64;
    (elapsed / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Largest-unit-first description of the time left before `maturity`.
///
/// Months are 30 days and years 12 months.
pub fn human_remaining(maturity: Timestamp, now: Timestamp) -> String {
    let diff = maturity.millis_since(now);
    if diff <= 0 {
        return "Matured".to_string();
    }

    let days = diff / MILLIS_PER_DAY;
    let months = days / DAYS_PER_MONTH;
    let years = months / MONTHS_PER_YEAR;

    if years > 0 {
        let rest = months % MONTHS_PER_YEAR;
        if rest > 0 {
            return format!("{} {}", plural(years, "year"), plural(rest, "month"));
        }
        return plural(years, "year");
    }
    if months > 0 {
        return plural(months, "month");
    }
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => plural(days, "day"),
    }
}

/// Short label for a tranche card, from a [`days_until`] value.
pub fn remaining_label(days_until: i64) -> String {
    match days_until {
        d if d < 0 => "Matured".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d if d < 30 => plural(d, "day"),
        d if d < 365 => plural(d / 30, "month"),
        d => plural(d / 365, "year"),
    }
}

/// `Jan 5, 2025`.
pub fn format_date(ts: Timestamp) -> String {
    ts.to_datetime()
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "Invalid date".to_string())
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
