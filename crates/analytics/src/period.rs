//! Reporting periods and date query parameters.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DomainError, DomainResult};

/// Longest period a report may cover (about a century).
pub const MAX_PERIOD_DAYS: i64 = 36_500;

/// Closed time window `[start_date, end_date]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days: i64,
}

/// Raw period parameters as they arrive on a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PeriodParams {
    pub days: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Period {
    /// The `days` days ending at `now`.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> DomainResult<Self> {
        Ok(Self {
            start_date: days_before(now, days)?,
            end_date: now,
            days,
        })
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::field("end_date", "end_date must not be before start_date"));
        }
        let days = (end.date_naive() - start.date_naive()).num_days().max(1);
        if days > MAX_PERIOD_DAYS {
            return Err(DomainError::field(
                "start_date",
                format!("A period may span at most {MAX_PERIOD_DAYS} days"),
            ));
        }
        // The preceding window of equal length must be representable too.
        if start.checked_sub_signed(end - start).is_none() {
            return Err(DomainError::field("start_date", "start_date is out of range"));
        }
        Ok(Self {
            start_date: start,
            end_date: end,
            days,
        })
    }

    /// Resolve query parameters. An explicit date range wins over `days`.
    pub fn from_params(params: &PeriodParams, default_days: i64, now: DateTime<Utc>) -> DomainResult<Self> {
        let start = params
            .start_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_param("start_date", s, false))
            .transpose()?;
        let end = params
            .end_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_param("end_date", s, true))
            .transpose()?;
        let days = params.days.unwrap_or(default_days);

        match (start, end) {
            (Some(start), Some(end)) => Self::between(start, end),
            (Some(start), None) => Self::between(start, now.max(start)),
            (None, Some(end)) => Self::between(days_before(end, days)?, end),
            (None, None) => Self::last_days(now, days),
        }
    }

    /// The equally long window immediately before this one.
    pub fn previous(&self) -> Self {
        let span = self.end_date - self.start_date;
        Self {
            start_date: self
                .start_date
                .checked_sub_signed(span)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end_date: self.start_date,
            days: self.days,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

/// `at` minus `days` whole days; `days` must be within `1..=MAX_PERIOD_DAYS`.
fn days_before(at: DateTime<Utc>, days: i64) -> DomainResult<DateTime<Utc>> {
    if days <= 0 {
        return Err(DomainError::field("days", "days must be a positive number"));
    }
    if days > MAX_PERIOD_DAYS {
        return Err(DomainError::field(
            "days",
            format!("days must be at most {MAX_PERIOD_DAYS}"),
        ));
    }
    Duration::try_days(days)
        .and_then(|span| at.checked_sub_signed(span))
        .ok_or_else(|| DomainError::field("days", "days reaches outside the supported date range"))
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Plain dates resolve to the start of the day, or its last second when
/// `end_of_day` is set.
pub fn parse_date_param(field: &'static str, raw: &str, end_of_day: bool) -> DomainResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        DomainError::field(field, format!("Invalid {field} format. Use YYYY-MM-DD"))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time).and_utc())
}
