use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::snapshot::{OutreachTotals, Snapshot};

const STRONG_UP_MIN: f64 = 0.15;
const GROWING_MIN: f64 = 0.05;
const STEADY_MIN: f64 = -0.05;
const SLIPPING_MIN: f64 = -0.15;

/// Period-over-period classification. `New` sits outside the ordered scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Momentum {
    Falling,
    Slipping,
    Steady,
    Growing,
    StrongUp,
    New,
}

impl Momentum {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Falling,
            Self::Slipping,
            Self::Steady,
            Self::Growing,
            Self::StrongUp,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Falling => "falling",
            Self::Slipping => "slipping",
            Self::Steady => "steady",
            Self::Growing => "growing",
            Self::StrongUp => "strong-up",
            Self::New => "new",
        }
    }

    /// Position on the falling..strong-up scale.
    pub const fn scale_rank(self) -> Option<u8> {
        match self {
            Self::Falling => Some(0),
            Self::Slipping => Some(1),
            Self::Steady => Some(2),
            Self::Growing => Some(3),
            Self::StrongUp => Some(4),
            Self::New => None,
        }
    }

    pub const fn is_improving(self) -> bool {
        matches!(self, Self::Growing | Self::StrongUp)
    }

    pub const fn is_declining(self) -> bool {
        matches!(self, Self::Falling | Self::Slipping)
    }
}

/// Classify a relative change such as `0.12` for +12%.
pub fn classify_change(change: f64) -> Momentum {
    if change >= STRONG_UP_MIN {
        Momentum::StrongUp
    } else if change >= GROWING_MIN {
        Momentum::Growing
    } else if change >= STEADY_MIN {
        Momentum::Steady
    } else if change >= SLIPPING_MIN {
        Momentum::Slipping
    } else {
        Momentum::Falling
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub metric: String,
    pub this_period: f64,
    pub last_period: f64,
    /// Relative change, absent when the last period was zero.
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub momentum: Momentum,
}

/// Compare two periods of one metric. A zero last period is always `new`.
pub fn classify(metric: impl Into<String>, this_period: f64, last_period: f64) -> TrendResult {
    let change = (last_period != 0.0).then(|| (this_period - last_period) / last_period);
    TrendResult {
        metric: metric.into(),
        this_period,
        last_period,
        change,
        percent_change: change.map(|value| value * 100.0),
        momentum: change.map(classify_change).unwrap_or(Momentum::New),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTrend {
    pub role: String,
    pub sent: TrendResult,
    pub reply_rate: TrendResult,
}

/// Outreach momentum between two snapshots. Reply rates are in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingTrends {
    pub this_date: NaiveDate,
    pub last_date: NaiveDate,
    pub sent: TrendResult,
    pub replied: TrendResult,
    pub reply_rate: TrendResult,
    pub by_role: BTreeMap<String, RoleTrend>,
}

pub fn compare_snapshots(this: &Snapshot, last: &Snapshot) -> SourcingTrends {
    let roles: BTreeSet<&String> = this.by_role.keys().chain(last.by_role.keys()).collect();
    let empty = OutreachTotals::default();
    let by_role = roles
        .into_iter()
        .map(|role| {
            let current = this.by_role.get(role).unwrap_or(&empty);
            let previous = last.by_role.get(role).unwrap_or(&empty);
            let trend = RoleTrend {
                role: role.clone(),
                sent: classify("sent", current.sent as f64, previous.sent as f64),
                reply_rate: classify(
                    "reply_rate",
                    current.reply_rate_pct(),
                    previous.reply_rate_pct(),
                ),
            };
            (role.clone(), trend)
        })
        .collect();

    SourcingTrends {
        this_date: this.date,
        last_date: last.date,
        sent: classify("sent", this.totals.sent as f64, last.totals.sent as f64),
        replied: classify(
            "replied",
            this.totals.replied as f64,
            last.totals.replied as f64,
        ),
        reply_rate: classify(
            "reply_rate",
            this.totals.reply_rate_pct(),
            last.totals.reply_rate_pct(),
        ),
        by_role,
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// "This week" is the seven days ending at the as-of date; "last week" the seven before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindows {
    pub this_period: DateRange,
    pub last_period: DateRange,
}

impl PeriodWindows {
    pub fn trailing(as_of: NaiveDate) -> Self {
        let this_start = as_of - Duration::days(6);
        let last_end = this_start - Duration::days(1);
        Self {
            this_period: DateRange {
                start: this_start,
                end: as_of,
            },
            last_period: DateRange {
                start: last_end - Duration::days(6),
                end: last_end,
            },
        }
    }
}

/// Latest snapshot inside the range. Sequence totals are cumulative, so it stands for the window.
pub fn latest_in<'a, I>(snapshots: I, range: DateRange) -> Option<&'a Snapshot>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    snapshots
        .into_iter()
        .filter(|snapshot| range.contains(snapshot.date))
        .max_by_key(|snapshot| snapshot.date)
}
