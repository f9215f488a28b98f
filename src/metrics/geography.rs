// 🌎 Customer Geography - Top cities by customer count

use crate::records::CustomerRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_GEOGRAPHY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    /// None groups customers with no default address city
    #[serde(rename = "_id")]
    pub city: Option<String>,
    pub count: usize,
}

/// Customers per city, most populous first (ties by city name), truncated to `limit`
pub fn customer_geography(customers: &[CustomerRecord], limit: usize) -> Vec<CityCount> {
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for customer in customers {
        *counts.entry(customer.city.as_deref()).or_insert(0) += 1;
    }

    let mut cities: Vec<CityCount> = counts
        .into_iter()
        .map(|(city, count)| CityCount {
            city: city.map(str::to_string),
            count,
        })
        .collect();

    cities.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
    cities.truncate(limit);
    cities
}
