//! Infrastructure layer: transactional store, SQLite journal, analytics cache,
//! configuration and the application services built on them.

pub mod cache;
pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use cache::{AnalyticsCache, CacheStats};
pub use config::AppConfig;
pub use error::{ServiceError, ServiceResult};
pub use services::Services;
pub use store::{Store, Tables};
