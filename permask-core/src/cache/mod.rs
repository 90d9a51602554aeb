pub mod invalidation;
pub mod mask_cache;

pub use invalidation::{CacheInvalidationService, InvalidationMessage};
pub use mask_cache::{PermissionCache, DEFAULT_L1_CAPACITY};
