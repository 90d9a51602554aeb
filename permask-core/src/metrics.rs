//! Prometheus metrics for permission resolution
//!
//! The embedding application exposes [`REGISTRY`] through its own scrape endpoint.

use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

/// Mask cache operations
pub mod cache {
    use prometheus::{register_counter_vec_with_registry, CounterVec};

    use super::REGISTRY;

    /// Mask cache hit counter, labelled by level (`l1` or `store`)
    pub static MASK_CACHE_HITS: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "permask_cache_hits_total",
            "Total number of permission mask cache hits",
            &["level"],
            REGISTRY.clone()
        )
        .expect("Failed to register MASK_CACHE_HITS")
    });

    /// Mask cache miss counter, labelled by level (`l1` or `store`)
    pub static MASK_CACHE_MISSES: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "permask_cache_misses_total",
            "Total number of permission mask cache misses",
            &["level"],
            REGISTRY.clone()
        )
        .expect("Failed to register MASK_CACHE_MISSES")
    });

    /// Flushes, labelled by kind (`actor` or `all`)
    pub static MASK_CACHE_FLUSHES: std::sync::LazyLock<CounterVec> = std::sync::LazyLock::new(|| {
        register_counter_vec_with_registry!(
            "permask_cache_flushes_total",
            "Total number of permission mask cache flushes",
            &["kind"],
            REGISTRY.clone()
        )
        .expect("Failed to register MASK_CACHE_FLUSHES")
    });
}

/// Mask compilation
pub mod compile {
    use prometheus::{
        register_histogram_with_registry, register_int_counter_with_registry, Histogram, IntCounter,
    };

    use super::REGISTRY;

    pub static MASK_COMPILATIONS: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "permask_compilations_total",
            "Total number of permission masks compiled from role data",
            REGISTRY.clone()
        )
        .expect("Failed to register MASK_COMPILATIONS")
    });

    pub static MASK_COMPILE_DURATION: std::sync::LazyLock<Histogram> = std::sync::LazyLock::new(|| {
        register_histogram_with_registry!(
            "permask_compile_duration_seconds",
            "Time spent loading roles and compiling one mask",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            REGISTRY.clone()
        )
        .expect("Failed to register MASK_COMPILE_DURATION")
    });
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
