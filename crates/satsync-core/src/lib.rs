use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod markup;
pub mod sku;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use markup::{apply_markup, round_to_minor_unit, select_rule, DefaultMarkupPolicy, MarkupRule};
pub use sku::load_skus_from_file;
pub use types::{Availability, ExtractedPrice, FinalPrice, MatchConfidence};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
