// Per-year / per-month entry counts for a timeline
//
// The distribution is the authoritative source of `total_count`; the
// planner clamps viewports against it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub month: u32,
    #[serde(default)]
    pub total_entry_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBucket {
    pub year: i32,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub month_distribution: Vec<MonthBucket>,
}

/// Year buckets in delivery order (reverse-chronological for a timeline).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimelineDistribution {
    years: Vec<YearBucket>,
}

impl<'de> Deserialize<'de> for TimelineDistribution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        skip_nulls(deserializer).map(|years| Self { years })
    }
}

/// Accept `null`, missing, or arrays containing `null` and keep the present items.
fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

impl TimelineDistribution {
    pub fn new(years: Vec<YearBucket>) -> Self {
        Self { years }
    }

    pub fn years(&self) -> &[YearBucket] {
        &self.years
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Sum of every month's entry count. Missing counts contribute nothing.
    pub fn total_count(&self) -> u64 {
        self.month_buckets()
            .map(|(_, month)| month.total_entry_count.unwrap_or(0))
            .sum()
    }

    /// Index of the first entry of the given month bucket.
    pub fn month_offset(&self, year: i32, month: u32) -> Option<u64> {
        let mut offset = 0;
        for (bucket_year, bucket) in self.month_buckets() {
            if bucket_year == year && bucket.month == month {
                return Some(offset);
            }
            offset += bucket.total_entry_count.unwrap_or(0);
        }
        None
    }

    /// Build a distribution from dates that are already ordered the way the
    /// timeline indexes them. Consecutive runs of the same month form a bucket.
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut years: Vec<YearBucket> = Vec::new();
        for date in dates {
            let same_year = years.last().is_some_and(|y| y.year == date.year());
            if !same_year {
                years.push(YearBucket {
                    year: date.year(),
                    month_distribution: Vec::new(),
                });
            }
            let Some(year) = years.last_mut() else {
                continue;
            };
            match year.month_distribution.last_mut() {
                Some(bucket) if bucket.month == date.month() => {
                    bucket.total_entry_count = Some(bucket.total_entry_count.unwrap_or(0) + 1);
                }
                _ => year.month_distribution.push(MonthBucket {
                    month: date.month(),
                    total_entry_count: Some(1),
                }),
            }
        }
        Self { years }
    }

    fn month_buckets(&self) -> impl Iterator<Item = (i32, &MonthBucket)> + '_ {
        self.years
            .iter()
            .flat_map(|year| year.month_distribution.iter().map(move |m| (year.year, m)))
    }
}
