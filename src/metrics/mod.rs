// Derived-Metric Computers
//
// Each computer is a pure function over already-fetched records (or over a
// series produced by the bucketing aggregator). No shared state.

pub mod acquisition;
pub mod cohort;
pub mod geography;
pub mod growth;
pub mod repeat;

pub use acquisition::new_entity_counts;
pub use cohort::{cohort_ltv, CohortSummary};
pub use geography::{customer_geography, CityCount, DEFAULT_GEOGRAPHY_LIMIT};
pub use growth::{growth_rates, round_to_2_decimals, GrowthPoint};
pub use repeat::repeat_counts;
