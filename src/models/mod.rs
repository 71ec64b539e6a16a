//! Data models

pub mod prediction;
pub mod snapshot;
pub mod alert;

pub use prediction::*;
pub use snapshot::*;
pub use alert::*;

use serde::Deserialize;

/// Pagination for list endpoints
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
