// 👥 Cohort Averager - Customer lifetime value by acquisition month
//
// Two passes instead of a per-order lookup:
//   1. customers → map of customer id → signup instant (when parseable)
//   2. stream orders, accumulating per-customer spend and first order instant
//
// Cohort of a customer, first match wins:
//   a) month of its own created_at
//   b) month of its earliest parseable order (customer absent or malformed)
//   c) 1970-01
//
// The average is taken across customers, not across orders.

use crate::aggregation::sales_amount;
use crate::period::{classify_datetime, Granularity, PeriodKey};
use crate::records::{CustomerRecord, EntityKeyed, OrderRecord, Timestamped};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    #[serde(rename = "_id")]
    pub cohort: PeriodKey,
    pub avg_ltv: f64,
    pub customer_count: usize,
}

#[derive(Default)]
struct CustomerLedger {
    total_spent: f64,
    first_order: Option<DateTime<FixedOffset>>,
}

pub fn cohort_ltv(orders: &[OrderRecord], customers: &[CustomerRecord]) -> Vec<CohortSummary> {
    // Pass 1: signup instants
    let mut signups: HashMap<&str, DateTime<FixedOffset>> = HashMap::new();
    for customer in customers {
        let Some(id) = customer.entity_id() else {
            continue;
        };
        if let Some(Ok(created)) = customer.timestamp().map(|ts| ts.resolve()) {
            signups.entry(id).or_insert(created);
        }
    }

    // Pass 2: per-customer spend
    let mut ledgers: HashMap<&str, CustomerLedger> = HashMap::new();
    let mut anonymous = 0usize;
    for order in orders {
        let Some(id) = order.entity_id() else {
            anonymous += 1;
            continue;
        };

        let ledger = ledgers.entry(id).or_default();
        ledger.total_spent += sales_amount(order);

        if let Some(Ok(placed)) = order.timestamp().map(|ts| ts.resolve()) {
            if ledger.first_order.map_or(true, |first| placed < first) {
                ledger.first_order = Some(placed);
            }
        }
    }

    let mut cohorts: BTreeMap<PeriodKey, (f64, usize)> = BTreeMap::new();
    for (id, ledger) in &ledgers {
        let cohort = signups
            .get(id)
            .copied()
            .or(ledger.first_order)
            .map(|dt| classify_datetime(&dt, Granularity::Monthly))
            .unwrap_or_else(PeriodKey::epoch_month);

        let entry = cohorts.entry(cohort).or_insert((0.0, 0));
        entry.0 += ledger.total_spent;
        entry.1 += 1;
    }

    tracing::debug!(
        customers = ledgers.len(),
        matched = ledgers.keys().filter(|id| signups.contains_key(*id)).count(),
        anonymous,
        cohorts = cohorts.len(),
        "computed cohort lifetime value"
    );

    cohorts
        .into_iter()
        .map(|(cohort, (total, count))| CohortSummary {
            cohort,
            avg_ltv: total / count as f64,
            customer_count: count,
        })
        .collect()
}
