// 🆕 New-Entity Count - How many customers joined in each period

use crate::aggregation::{aggregate, count_one, TimeSeries};
use crate::period::Granularity;
use crate::records::Timestamped;

/// Count creation records per period
pub fn new_entity_counts<R: Timestamped>(records: &[R], granularity: Granularity) -> TimeSeries {
    aggregate(records, granularity, count_one)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodKey;
    use crate::records::CustomerRecord;

    #[test]
    fn test_counts_customers_per_month() {
        let customers = vec![
            CustomerRecord::new("1", "2023-12-31T23:59:59Z"),
            CustomerRecord::new("2", "2024-01-01T00:00:00Z"),
            CustomerRecord::new("3", "2024-01-15T12:00:00Z"),
        ];

        let series = new_entity_counts(&customers, Granularity::Monthly);

        assert_eq!(series.len(), 2);
        assert_eq!(series.get(&PeriodKey::from("2023-12")), Some(1.0));
        assert_eq!(series.get(&PeriodKey::from("2024-01")), Some(2.0));
    }

    #[test]
    fn test_customers_without_dates_are_not_counted() {
        let customers = vec![
            CustomerRecord::new("1", "2024-03-01"),
            CustomerRecord {
                created_at: None,
                ..CustomerRecord::new("2", "2024-03-01")
            },
        ];

        let series = new_entity_counts(&customers, Granularity::Yearly);
        assert_eq!(series.total(), 1.0);
    }
}
