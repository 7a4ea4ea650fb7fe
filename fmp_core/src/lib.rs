#![warn(clippy::all, clippy::pedantic, clippy::multiple_crate_versions)]

pub use fmp_collision as collision;
pub use fmp_format as format;
pub use fmp_uncased as uncased;
