//! Calendar alignment between providers with different frequencies.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::Observation;
use crate::serde_utils::round2;

/// Average daily observations into `YYYY-MM` buckets, rounded to 2 decimals.
pub fn monthly_average(observations: &[Observation]) -> BTreeMap<String, f64> {
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.value.is_finite()) {
        let entry = buckets.entry(obs.month_key()).or_insert((0.0, 0));
        entry.0 += obs.value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(month, (sum, count))| (month, round2(sum / count as f64)))
        .collect()
}

/// Two level series restricted to the dates present in both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedLevels {
    pub dates: Vec<NaiveDate>,
    pub headline: Vec<f64>,
    pub core: Vec<f64>,
}

impl AlignedLevels {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Intersect headline and core levels by date, ascending.
pub fn align_levels(headline: &[Observation], core: &[Observation]) -> AlignedLevels {
    let headline_by_date: BTreeMap<NaiveDate, f64> =
        headline.iter().map(|o| (o.date, o.value)).collect();
    let core_by_date: BTreeMap<NaiveDate, f64> = core.iter().map(|o| (o.date, o.value)).collect();

    let mut aligned = AlignedLevels::default();
    for (date, core_value) in core_by_date {
        if let Some(&headline_value) = headline_by_date.get(&date) {
            aligned.dates.push(date);
            aligned.headline.push(headline_value);
            aligned.core.push(core_value);
        }
    }
    aligned
}

/// Monthly value for each date, `None` where the month has no data.
pub fn lookup_monthly(dates: &[NaiveDate], monthly: &BTreeMap<String, f64>) -> Vec<Option<f64>> {
    dates
        .iter()
        .map(|d| monthly.get(&d.format("%Y-%m").to_string()).copied())
        .collect()
}
