mod auth_extractor;
mod metrics_layer;
mod payload_extractor;
mod tracing_layer;

pub use auth_extractor::{jwt_secret, validate_jwt, AdminUser, OptionalAuthUser, DEFAULT_JWT_SECRET};
pub use metrics_layer::{init_metrics, metrics_middleware};
pub use payload_extractor::{ApiJson, ApiPath, ApiQuery};
pub use tracing_layer::init_tracing;
