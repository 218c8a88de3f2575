//! Period return tables (monthly, quarterly, annual).
//!
//! Equity is resampled to UTC calendar period ends: the last equity value
//! inside each period, carried forward through periods with no bars. The
//! first period's return is 0.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use quantsim_core::engine::EquityPoint;

/// Resampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Monthly,
    Quarterly,
    Annual,
}

impl Period {
    pub const ALL: [Period; 3] = [Self::Monthly, Self::Quarterly, Self::Annual];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    /// Last calendar day of the period containing `date`.
    pub fn end_of(self, date: NaiveDate) -> NaiveDate {
        let year = date.year();
        let end_month = match self {
            Self::Monthly => date.month(),
            Self::Quarterly => (date.month() - 1) / 3 * 3 + 3,
            Self::Annual => 12,
        };
        last_day_of_month(year, end_month)
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// One row of a returns table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    pub period_end: NaiveDate,
    #[serde(rename = "return")]
    pub ret: f64,
    pub return_pct: f64,
}

/// Period-end equity and simple return for every period spanned by `equity`.
pub fn returns_table(equity: &[EquityPoint], period: Period) -> Vec<PeriodReturn> {
    let mut last_by_period: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in equity {
        last_by_period.insert(period.end_of(point.timestamp.date_naive()), point.equity);
    }
    let (Some(&first_end), Some(&last_end)) =
        (last_by_period.keys().next(), last_by_period.keys().next_back())
    else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut prev: Option<f64> = None;
    let mut end = first_end;
    while end <= last_end {
        let value = last_by_period.get(&end).copied().or(prev).unwrap_or(f64::NAN);
        let ret = match prev {
            Some(p) => value / p - 1.0,
            None => 0.0,
        };
        rows.push(PeriodReturn {
            period_end: end,
            ret,
            return_pct: ret * 100.0,
        });
        prev = Some(value);
        end = period.end_of(end + Duration::days(1));
    }
    rows
}
