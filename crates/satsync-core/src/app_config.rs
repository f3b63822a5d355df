use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Bitrix information block that holds the product catalog.
    pub iblock_id: i64,
    /// Article prefix that marks supplier-sourced products (e.g. `тов-`).
    pub supplier_prefix: String,
    /// Destination price tier (`b_catalog_price.CATALOG_GROUP_ID`).
    pub price_type_id: i64,
    pub currency: String,
    pub lock_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_base_url: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_workers: usize,
    /// Minimum delay before every outgoing request. A hard floor, not a hint.
    pub scraper_request_delay_ms: u64,
    pub scraper_max_retries: u32,
    /// Backoff unit for HTTP 429: wait `attempt * unit` seconds.
    pub scraper_rate_limit_unit_secs: u64,
    /// Backoff unit for network-level failures: wait `attempt * unit` seconds.
    pub scraper_network_retry_unit_secs: u64,
    /// Percent applied when no markup rule matches and no prefix default does.
    pub markup_generic_default_percent: f64,
    /// Per-prefix default percents, checked in order before the generic one.
    pub markup_prefix_defaults: Vec<(String, f64)>,
    pub recalc_batch_size: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("iblock_id", &self.iblock_id)
            .field("supplier_prefix", &self.supplier_prefix)
            .field("price_type_id", &self.price_type_id)
            .field("currency", &self.currency)
            .field("lock_path", &self.lock_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("scraper_base_url", &self.scraper_base_url)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_workers", &self.scraper_max_workers)
            .field("scraper_request_delay_ms", &self.scraper_request_delay_ms)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_rate_limit_unit_secs",
                &self.scraper_rate_limit_unit_secs,
            )
            .field(
                "scraper_network_retry_unit_secs",
                &self.scraper_network_retry_unit_secs,
            )
            .field(
                "markup_generic_default_percent",
                &self.markup_generic_default_percent,
            )
            .field("markup_prefix_defaults", &self.markup_prefix_defaults)
            .field("recalc_batch_size", &self.recalc_batch_size)
            .finish()
    }
}
