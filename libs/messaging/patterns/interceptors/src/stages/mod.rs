//! Built-in stages, in their default order

pub mod logging;
pub mod performance;
pub mod throttle;
pub mod validation;

pub use logging::LoggingInterceptor;
pub use performance::{PerformanceInterceptor, DEFAULT_LATENCY_TARGET_US};
pub use throttle::ThrottlingInterceptor;
pub use validation::ValidationInterceptor;
