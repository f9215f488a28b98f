// Shop Analytics - Core Library
// Time-bucketed sales/customer analytics over raw order and customer documents.
// Exposes all modules for use in the CLI, the API server, and tests.

pub mod error;
pub mod period;          // Period Classifier
pub mod records;         // Recognized fields per record kind
pub mod aggregation;     // Bucketing Aggregator
pub mod metrics;         // Derived-Metric Computers
pub mod store;           // Record sources (SQLite, memory) + import
pub mod analytics;       // Request-level engine
pub mod config;

// Re-export commonly used types
pub use error::{AnalyticsError, Result};
pub use period::{classify, classify_datetime, parse_timestamp, Granularity, PeriodKey, Timestamp};
pub use records::{CustomerRecord, EntityKeyed, OrderRecord, Timestamped};
pub use aggregation::{
    aggregate, aggregate_with_stats, count_one, sales_amount,
    AggregationStats, TimeSeries, TimeSeriesPoint,
};
pub use metrics::{
    cohort_ltv, customer_geography, growth_rates, new_entity_counts, repeat_counts,
    CityCount, CohortSummary, GrowthPoint,
};
pub use store::{
    load_documents, ImportSummary, MemoryStore, RecordSource, SqliteStore,
};
pub use analytics::{AnalyticsEngine, PeriodCount, RepeatCustomers, SalesTotal};
pub use config::{init_tracing, CollectionNames, Config};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
