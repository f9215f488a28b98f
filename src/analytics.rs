// 📊 Analytics Engine - Fetch → recognize → compute
//
// One engine per request. Each operation fetches the collection(s) it needs,
// converts documents into recognized records and runs exactly one computer.
// Rows serialize with the field names the dashboard already consumes.

use crate::aggregation::{aggregate, sales_amount, TimeSeries};
use crate::config::CollectionNames;
use crate::error::{AnalyticsError, Result};
use crate::metrics::{
    cohort_ltv, customer_geography, growth_rates, new_entity_counts, repeat_counts, CityCount,
    CohortSummary, GrowthPoint, DEFAULT_GEOGRAPHY_LIMIT,
};
use crate::period::{Granularity, PeriodKey};
use crate::records::{CustomerRecord, OrderRecord};
use crate::store::RecordSource;
use serde::{Deserialize, Serialize};

// ============================================================================
// RESULT ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTotal {
    #[serde(rename = "_id")]
    pub period: PeriodKey,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCount {
    #[serde(rename = "_id")]
    pub period: PeriodKey,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatCustomers {
    #[serde(rename = "_id")]
    pub period: PeriodKey,
    pub repeat_customers: u64,
}

fn counts(series: &TimeSeries) -> impl Iterator<Item = (PeriodKey, u64)> + '_ {
    series.iter().map(|p| (p.period.clone(), p.value as u64))
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct AnalyticsEngine<S: RecordSource> {
    source: S,
    collections: CollectionNames,
    geography_limit: usize,
}

impl<S: RecordSource> AnalyticsEngine<S> {
    pub fn new(source: S) -> Self {
        AnalyticsEngine {
            source,
            collections: CollectionNames::default(),
            geography_limit: DEFAULT_GEOGRAPHY_LIMIT,
        }
    }

    pub fn with_collections(mut self, collections: CollectionNames) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_geography_limit(mut self, limit: usize) -> Self {
        self.geography_limit = limit;
        self
    }

    /// Sales summed per period
    pub fn total_sales(&self, granularity: Granularity) -> Result<Vec<SalesTotal>> {
        let orders = self.orders()?;
        let series = aggregate(&orders, granularity, sales_amount);

        Ok(series
            .iter()
            .map(|p| SalesTotal {
                period: p.period.clone(),
                total_sales: p.value,
            })
            .collect())
    }

    /// Period-over-period growth of total sales
    pub fn sales_growth(&self, granularity: Granularity) -> Result<Vec<GrowthPoint>> {
        let orders = self.orders()?;
        let series = aggregate(&orders, granularity, sales_amount);
        Ok(growth_rates(&series))
    }

    pub fn new_customers(&self, granularity: Granularity) -> Result<Vec<PeriodCount>> {
        let customers = self.customers()?;
        let series = new_entity_counts(&customers, granularity);

        Ok(counts(&series)
            .map(|(period, count)| PeriodCount { period, count })
            .collect())
    }

    pub fn repeat_customers(&self, granularity: Granularity) -> Result<Vec<RepeatCustomers>> {
        let orders = self.orders()?;
        let series = repeat_counts(&orders, granularity);

        Ok(counts(&series)
            .map(|(period, repeat_customers)| RepeatCustomers {
                period,
                repeat_customers,
            })
            .collect())
    }

    pub fn customer_geography(&self) -> Result<Vec<CityCount>> {
        let customers = self.customers()?;
        Ok(customer_geography(&customers, self.geography_limit))
    }

    pub fn customer_ltv(&self) -> Result<Vec<CohortSummary>> {
        let orders = self.orders()?;
        let customers = self.customers()?;
        Ok(cohort_ltv(&orders, &customers))
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    fn orders(&self) -> Result<Vec<OrderRecord>> {
        let docs = self.fetch(&self.collections.orders)?;
        Ok(docs.iter().map(OrderRecord::from_document).collect())
    }

    fn customers(&self) -> Result<Vec<CustomerRecord>> {
        let docs = self.fetch(&self.collections.customers)?;
        Ok(docs.iter().map(CustomerRecord::from_document).collect())
    }

    fn fetch(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        let docs = self.source.fetch_all(collection).map_err(|e| {
            tracing::error!(collection, error = %e, "record fetch failed");
            AnalyticsError::DataSourceUnavailable {
                collection: collection.to_string(),
                reason: format!("{:#}", e),
            }
        })?;

        tracing::debug!(collection, documents = docs.len(), "fetched records");
        Ok(docs)
    }
}
