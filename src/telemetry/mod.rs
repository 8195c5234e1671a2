pub mod init;
pub mod metrics;

pub use init::{TelemetryGuard, init_telemetry};
pub use metrics::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL};
