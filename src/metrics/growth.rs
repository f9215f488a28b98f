// 📈 Growth Rate - Period-over-period percentage change
//
//   rate[i] = (v[i] - v[i-1]) / v[i-1] * 100      for i ≥ 1
//
// No prior sales (v[i-1] == 0) is defined as 0% growth. The first period has no
// predecessor and is never reported.

use crate::aggregation::TimeSeries;
use crate::period::PeriodKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    #[serde(rename = "date")]
    pub period: PeriodKey,
    pub growth_rate: f64,
}

/// Round to the two decimal places reported to callers
pub fn round_to_2_decimals(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid reporting "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn growth_rates(series: &TimeSeries) -> Vec<GrowthPoint> {
    series
        .points()
        .windows(2)
        .map(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            let rate = if previous.value == 0.0 {
                0.0
            } else {
                (current.value - previous.value) / previous.value * 100.0
            };

            GrowthPoint {
                period: current.period.clone(),
                growth_rate: round_to_2_decimals(rate),
            }
        })
        .collect()
}
