pub mod category;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod types;

pub use category::Category;
pub use engine::{Comparator, ContentFetcher};
pub use error::CompareError;
pub use normalize::PathNormalizer;

use chrono::{SecondsFormat, Utc};

/// Wall-clock fallback used when a file has no usable timestamp.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
