//! The virtual filesystem over conversation records.
//!
//! - [`path`]: normalized paths and the namespace layout
//! - [`navigator`]: directory listings per view, validated resolution
//! - [`cache`]: TTL listing cache with staged writes
//! - [`recent`]: calendar buckets for `/recent`
//! - [`resolver`]: id prefix resolution within a directory

pub mod cache;
pub mod navigator;
pub mod path;
pub mod recent;
pub mod resolver;

pub use cache::{Clock, ListingCache, ManualClock, SystemClock};
pub use navigator::Navigator;
pub use path::{PathKind, VfsPath, normalize};
pub use recent::RecentPeriod;
pub use resolver::{MIN_PREFIX_LEN, resolve_prefix};
