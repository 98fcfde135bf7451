//! Capture-time bounds and the preset ranges offered by the date menu.

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Capture-time bounds in Unix seconds. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub before: Option<i64>,
    pub after: Option<i64>,
}

impl DateRange {
    pub const UNBOUNDED: Self = Self {
        before: None,
        after: None,
    };

    pub fn new(after: Option<i64>, before: Option<i64>) -> Self {
        Self { before, after }
    }

    pub fn is_unbounded(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DatePreset {
    All,
    Today,
    Yesterday,
    #[value(name = "last-7-days")]
    Last7Days,
    ThisMonth,
    LastMonth,
}

impl DatePreset {
    /// Range relative to the local clock.
    pub fn range(self) -> DateRange {
        self.range_at(&Local::now())
    }

    /// Range relative to `now`, with day boundaries at midnight in `now`'s zone.
    pub fn range_at<Tz: TimeZone>(self, now: &DateTime<Tz>) -> DateRange {
        let tz = now.timezone();
        let today = now.date_naive();
        let midnight = |date: Option<NaiveDate>| date.and_then(|d| start_of_day(&tz, d));
        let first_of_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1);

        match self {
            Self::All => DateRange::UNBOUNDED,
            Self::Today => DateRange::new(midnight(Some(today)), None),
            Self::Yesterday => DateRange::new(
                midnight(today.checked_sub_days(Days::new(1))),
                midnight(Some(today)),
            ),
            Self::Last7Days => DateRange::new(midnight(today.checked_sub_days(Days::new(7))), None),
            Self::ThisMonth => DateRange::new(midnight(first_of_month), None),
            Self::LastMonth => DateRange::new(
                midnight(first_of_month.and_then(|d| d.checked_sub_months(Months::new(1)))),
                midnight(first_of_month),
            ),
        }
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    let ts = tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        // Midnight can fall in a DST gap; fall back to the UTC reading.
        .unwrap_or_else(|| naive.and_utc().timestamp());
    Some(ts)
}
