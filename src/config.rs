// ⚙️ Configuration - Environment variables (optionally from .env)
//
//   ANALYTICS_DB_PATH              SQLite file            (analytics.db)
//   ANALYTICS_BIND_ADDR            HTTP listen address    (0.0.0.0:3000)
//   ANALYTICS_ORDERS_COLLECTION    order documents        (shopifyOrders)
//   ANALYTICS_CUSTOMERS_COLLECTION customer documents     (shopifyCustomers)
//   ANALYTICS_GEOGRAPHY_LIMIT      top-N cities           (20)
//   RUST_LOG                       tracing filter         (info)

use crate::metrics::DEFAULT_GEOGRAPHY_LIMIT;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_ORDERS_COLLECTION: &str = "shopifyOrders";
pub const DEFAULT_CUSTOMERS_COLLECTION: &str = "shopifyCustomers";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub collections: CollectionNames,
    pub geography_limit: usize,
}

/// Which store collections hold orders and customers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub orders: String,
    pub customers: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        CollectionNames {
            orders: DEFAULT_ORDERS_COLLECTION.to_string(),
            customers: DEFAULT_CUSTOMERS_COLLECTION.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("analytics.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
            collections: CollectionNames::default(),
            geography_limit: DEFAULT_GEOGRAPHY_LIMIT,
        }
    }
}

impl Config {
    /// Read from the process environment; call `dotenv::dotenv()` first to honour `.env`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let geography_limit = match get("ANALYTICS_GEOGRAPHY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("ANALYTICS_GEOGRAPHY_LIMIT must be a count, got '{}'", raw))?,
            None => defaults.geography_limit,
        };

        Ok(Config {
            db_path: get("ANALYTICS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind_addr: get("ANALYTICS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            collections: CollectionNames {
                orders: get("ANALYTICS_ORDERS_COLLECTION").unwrap_or(defaults.collections.orders),
                customers: get("ANALYTICS_CUSTOMERS_COLLECTION")
                    .unwrap_or(defaults.collections.customers),
            },
            geography_limit,
        })
    }
}

/// Install the global tracing subscriber, filtered by RUST_LOG (fallback `default_filter`)
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
