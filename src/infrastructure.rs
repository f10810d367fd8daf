//! Infrastructure layer
//!
//! Adapters behind the domain traits (HTTP search providers, liveness probe,
//! workbook store) plus configuration, credentials and logging.

pub mod config;
pub mod credentials;
pub mod http_client;
pub mod liveness;
pub mod logging;
pub mod providers;
pub mod search_error;
pub mod throttle;
pub mod workbook;
pub mod xlsx_writer;

pub use config::{AppConfig, ConfigManager, ProviderKind};
pub use credentials::{ApiKey, CredentialResolver, GoogleCredentials, ProviderCredentials};
pub use http_client::{HttpClient, HttpClientConfig};
pub use liveness::HttpLivenessValidator;
pub use logging::init_logging_with_config;
pub use providers::build_providers;
pub use search_error::{SearchError, SearchResult};
pub use throttle::ThrottledProvider;
pub use workbook::Workbook;
