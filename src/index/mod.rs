//! Index structures kept alongside the memory tiers and the cache.

pub mod access_order;
pub mod key_index;

pub use access_order::AccessOrder;
pub use key_index::KeyIndex;
