// 🪣 Bucketing Aggregator - Records → ordered (period, value) series
//
// Every record is classified into a period and its extracted contribution is
// added to that period's bucket. Records whose timestamp cannot be classified
// are dropped, so one bad record never fails the whole aggregation.
//
// Conservation: series.total() == Σ extractor(r) over every classified record.

use crate::period::{classify, Granularity, PeriodKey};
use crate::records::{OrderRecord, Timestamped};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// TIME SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: PeriodKey,
    pub value: f64,
}

/// Strictly increasing by period, at most one point per period
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    /// Build from buckets; the map's ordering gives the series ordering
    pub fn from_buckets(buckets: BTreeMap<PeriodKey, f64>) -> Self {
        TimeSeries {
            points: buckets
                .into_iter()
                .map(|(period, value)| TimeSeriesPoint { period, value })
                .collect(),
        }
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeSeriesPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at `period`, if the series has a point there
    pub fn get(&self, period: &PeriodKey) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.period.cmp(period))
            .ok()
            .map(|i| self.points[i].value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Merge-by-period: values of shared periods are added
    pub fn merge(&self, other: &TimeSeries) -> TimeSeries {
        let mut buckets: BTreeMap<PeriodKey, f64> = BTreeMap::new();
        for point in self.points.iter().chain(other.points.iter()) {
            *buckets.entry(point.period.clone()).or_insert(0.0) += point.value;
        }
        TimeSeries::from_buckets(buckets)
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Order total; a missing or malformed amount contributes zero
pub fn sales_amount(order: &OrderRecord) -> f64 {
    match order.amount() {
        Ok(amount) => amount,
        Err(e) => {
            tracing::trace!(order_id = ?order.id, error = %e, "amount treated as zero");
            0.0
        }
    }
}

/// Constant contribution for counting records
pub fn count_one<R>(_record: &R) -> f64 {
    1.0
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AggregationStats {
    pub classified: usize,
    pub dropped: usize,
}

/// Bucket `records` by `granularity`, summing `extractor` per period
pub fn aggregate<R, F>(records: &[R], granularity: Granularity, extractor: F) -> TimeSeries
where
    R: Timestamped,
    F: Fn(&R) -> f64,
{
    aggregate_with_stats(records, granularity, extractor).0
}

/// [`aggregate`], also reporting how many records were bucketed and dropped
pub fn aggregate_with_stats<R, F>(
    records: &[R],
    granularity: Granularity,
    extractor: F,
) -> (TimeSeries, AggregationStats)
where
    R: Timestamped,
    F: Fn(&R) -> f64,
{
    let mut buckets: BTreeMap<PeriodKey, f64> = BTreeMap::new();
    let mut stats = AggregationStats::default();

    for record in records {
        let period = match record.timestamp().map(|ts| classify(ts, granularity)) {
            Some(Ok(period)) => period,
            Some(Err(e)) => {
                tracing::trace!(error = %e, "record dropped from aggregate");
                stats.dropped += 1;
                continue;
            }
            None => {
                stats.dropped += 1;
                continue;
            }
        };

        *buckets.entry(period).or_insert(0.0) += extractor(record);
        stats.classified += 1;
    }

    tracing::debug!(
        granularity = %granularity,
        classified = stats.classified,
        dropped = stats.dropped,
        periods = buckets.len(),
        "aggregated records"
    );

    (TimeSeries::from_buckets(buckets), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CustomerRecord;

    fn order(date: &str, amount: &str) -> OrderRecord {
        OrderRecord::new(date, amount, None)
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_monthly_sales() {
        let orders = vec![
            order("2023-01-05T10:00:00Z", "100.00"),
            order("2023-01-20T10:00:00Z", "50.50"),
            order("2023-02-01T10:00:00Z", "25"),
        ];

        let series = aggregate(&orders, Granularity::Monthly, sales_amount);

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].period.as_str(), "2023-01");
        assert!(approx_eq(series.points()[0].value, 150.50));
        assert_eq!(series.points()[1].period.as_str(), "2023-02");
        assert!(approx_eq(series.points()[1].value, 25.0));
    }

    #[test]
    fn test_output_sorted_regardless_of_input_order() {
        let orders = vec![
            order("2024-02-01", "1"),
            order("2023-11-01", "1"),
            order("2024-01-01", "1"),
            order("2023-12-01", "1"),
        ];

        let series = aggregate(&orders, Granularity::Quarterly, count_one);
        let periods: Vec<&str> = series.iter().map(|p| p.period.as_str()).collect();

        assert_eq!(periods, vec!["2023-Q4", "2024-Q1"]);
        assert_eq!(series.points()[0].value, 2.0);
        assert_eq!(series.points()[1].value, 2.0);
    }

    #[test]
    fn test_malformed_amount_contributes_zero() {
        let orders = vec![
            order("2023-01-05", "100"),
            order("2023-01-06", "not-a-number"),
            OrderRecord {
                amount_text: None,
                ..order("2023-01-07", "0")
            },
        ];

        let series = aggregate(&orders, Granularity::Monthly, sales_amount);

        assert_eq!(series.len(), 1);
        assert!(approx_eq(series.total(), 100.0));

        // Bad amounts still count as orders
        let counts = aggregate(&orders, Granularity::Monthly, count_one);
        assert_eq!(counts.total(), 3.0);
    }

    #[test]
    fn test_conservation_under_malformed_timestamps() {
        let good = vec![
            order("2023-03-01", "10"),
            order("2023-03-15", "20"),
            order("2023-04-01", "30"),
        ];

        let mut with_bad = good.clone();
        with_bad.push(order("garbage", "1000"));
        with_bad.push(OrderRecord {
            created_at: None,
            ..order("2023-03-01", "500")
        });

        let clean = aggregate(&good, Granularity::Monthly, sales_amount);
        let (dirty, stats) = aggregate_with_stats(&with_bad, Granularity::Monthly, sales_amount);

        assert_eq!(clean, dirty);
        assert_eq!(stats, AggregationStats { classified: 3, dropped: 2 });

        let expected: f64 = good.iter().map(sales_amount).sum();
        assert!(approx_eq(dirty.total(), expected));
    }

    #[test]
    fn test_additivity_over_disjoint_sets() {
        let a = vec![
            order("2023-01-01", "10"),
            order("2023-02-10", "5"),
            order("2023-02-11", "7.25"),
        ];
        let b = vec![
            order("2023-02-20", "3"),
            order("2023-03-01", "1.5"),
            order("bogus", "99"),
        ];

        for g in Granularity::ALL {
            let union: Vec<OrderRecord> = a.iter().chain(b.iter()).cloned().collect();
            let whole = aggregate(&union, g, sales_amount);
            let merged = aggregate(&a, g, sales_amount).merge(&aggregate(&b, g, sales_amount));

            assert_eq!(whole.len(), merged.len(), "{}", g);
            for (x, y) in whole.iter().zip(merged.iter()) {
                assert_eq!(x.period, y.period);
                assert!(approx_eq(x.value, y.value));
            }
        }
    }

    #[test]
    fn test_no_duplicate_periods() {
        let orders: Vec<OrderRecord> = (1..=28)
            .map(|d| order(&format!("2023-02-{:02}", d), "1"))
            .collect();

        let series = aggregate(&orders, Granularity::Monthly, count_one);
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(&PeriodKey::from("2023-02")), Some(28.0));

        let daily = aggregate(&orders, Granularity::Daily, count_one);
        assert_eq!(daily.len(), 28);
        assert!(daily.points().windows(2).all(|w| w[0].period < w[1].period));
    }

    #[test]
    fn test_empty_input() {
        let series = aggregate::<OrderRecord, _>(&[], Granularity::Yearly, sales_amount);
        assert!(series.is_empty());
        assert_eq!(series.total(), 0.0);
    }

    #[test]
    fn test_new_customer_counts() {
        let customers = vec![
            CustomerRecord::new("1", "2023-01-15"),
            CustomerRecord::new("2", "2023-01-31"),
            CustomerRecord::new("3", "2023-07-04"),
            CustomerRecord::new("4", "not a date"),
        ];

        let series = aggregate(&customers, Granularity::Quarterly, count_one);

        assert_eq!(series.get(&PeriodKey::from("2023-Q1")), Some(2.0));
        assert_eq!(series.get(&PeriodKey::from("2023-Q3")), Some(1.0));
        assert_eq!(series.total(), 3.0);
    }

    #[test]
    fn test_series_serializes_as_flat_points() {
        let series = aggregate(&[order("2023-05-05", "12.5")], Granularity::Yearly, sales_amount);
        let json = serde_json::to_value(&series).unwrap();

        assert_eq!(json, serde_json::json!([{ "period": "2023", "value": 12.5 }]));
    }
}
