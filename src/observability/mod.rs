// Observability for sources, the registry and the HTTP server
// Provides counters and request ids

pub mod metrics;

pub use metrics::Metrics;

use uuid::Uuid;

/// Generate a new request ID
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}
