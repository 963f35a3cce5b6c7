//! Production-friendly observability hooks for streaming sessions and the answer cache.
//!
//! ```rust
//! use gobserve::{MetricsObservabilityHooks, SafeSessionHooks, TracingObservabilityHooks};
//!
//! let _session_hooks = SafeSessionHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeCacheHooks, SafeSessionHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeCacheHooks, SafeSessionHooks, TracingObservabilityHooks,
    };
}

#[cfg(test)]
mod tests;
