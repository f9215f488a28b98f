// 🔁 Repeat-Entity Detector - Customers ordering more than once in a period
//
// Two-level grouping: customer → period → order count. A customer counts as a
// repeat customer in every period where it placed two or more orders.
// Repetition is judged within one period only: one order in January plus one
// in February is not a repeat in either month.
//
// Orders without a customer id are ignored entirely.

use crate::aggregation::TimeSeries;
use crate::period::{classify, Granularity, PeriodKey};
use crate::records::{EntityKeyed, Timestamped};
use std::collections::{BTreeMap, HashMap};

pub fn repeat_counts<R>(records: &[R], granularity: Granularity) -> TimeSeries
where
    R: Timestamped + EntityKeyed,
{
    let mut occurrences: HashMap<&str, HashMap<PeriodKey, u32>> = HashMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(entity) = record.entity_id() else {
            skipped += 1;
            continue;
        };
        let Some(Ok(period)) = record.timestamp().map(|ts| classify(ts, granularity)) else {
            skipped += 1;
            continue;
        };

        *occurrences
            .entry(entity)
            .or_default()
            .entry(period)
            .or_insert(0) += 1;
    }

    // Every period with at least one identified order appears, even with 0 repeats
    let mut repeats: BTreeMap<PeriodKey, f64> = BTreeMap::new();
    for periods in occurrences.values() {
        for (period, count) in periods {
            let slot = repeats.entry(period.clone()).or_insert(0.0);
            if *count > 1 {
                *slot += 1.0;
            }
        }
    }

    tracing::debug!(
        granularity = %granularity,
        customers = occurrences.len(),
        skipped,
        "computed repeat customers"
    );

    TimeSeries::from_buckets(repeats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::OrderRecord;

    fn order(customer: Option<&str>, date: &str) -> OrderRecord {
        OrderRecord::new(date, "10", customer)
    }

    fn as_pairs(series: &TimeSeries) -> Vec<(String, f64)> {
        series
            .iter()
            .map(|p| (p.period.to_string(), p.value))
            .collect()
    }

    #[test]
    fn test_single_repeat_customer() {
        let orders = vec![
            order(Some("1"), "2023-01-03"),
            order(Some("1"), "2023-01-20"),
            order(Some("2"), "2023-01-11"),
        ];

        let series = repeat_counts(&orders, Granularity::Monthly);
        assert_eq!(as_pairs(&series), vec![("2023-01".to_string(), 1.0)]);
    }

    #[test]
    fn test_repetition_is_within_period_only() {
        let orders = vec![
            order(Some("1"), "2023-01-15"),
            order(Some("1"), "2023-02-15"),
        ];

        let monthly = repeat_counts(&orders, Granularity::Monthly);
        assert_eq!(
            as_pairs(&monthly),
            vec![("2023-01".to_string(), 0.0), ("2023-02".to_string(), 0.0)]
        );

        // Same customer is a repeat once the bucket spans both orders
        let quarterly = repeat_counts(&orders, Granularity::Quarterly);
        assert_eq!(as_pairs(&quarterly), vec![("2023-Q1".to_string(), 1.0)]);
    }

    #[test]
    fn test_entity_counted_in_each_period_it_repeats() {
        let orders = vec![
            order(Some("1"), "2023-01-01"),
            order(Some("1"), "2023-01-02"),
            order(Some("1"), "2023-03-01"),
            order(Some("1"), "2023-03-09"),
            order(Some("1"), "2023-03-30"),
            order(Some("2"), "2023-03-05"),
            order(Some("2"), "2023-03-06"),
        ];

        let series = repeat_counts(&orders, Granularity::Monthly);
        assert_eq!(
            as_pairs(&series),
            vec![("2023-01".to_string(), 1.0), ("2023-03".to_string(), 2.0)]
        );
    }

    #[test]
    fn test_orders_without_customer_are_excluded() {
        let orders = vec![
            order(None, "2023-05-01"),
            order(None, "2023-05-02"),
            order(None, "2023-06-01"),
            order(Some("9"), "2023-05-03"),
        ];

        let series = repeat_counts(&orders, Granularity::Monthly);

        // Anonymous orders never form a "null" repeat customer, nor create periods
        assert_eq!(as_pairs(&series), vec![("2023-05".to_string(), 0.0)]);
    }

    #[test]
    fn test_unclassifiable_orders_are_excluded() {
        let orders = vec![
            order(Some("1"), "2023-05-01"),
            order(Some("1"), "sometime in May"),
        ];

        let series = repeat_counts(&orders, Granularity::Monthly);
        assert_eq!(as_pairs(&series), vec![("2023-05".to_string(), 0.0)]);
    }
}
