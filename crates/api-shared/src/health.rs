use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness of the backing stores
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusRes {
    /// Document database connected
    pub db: bool,
    /// Key-value cache connected
    pub redis: bool,
}

/// Stored record counts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatsRes {
    pub users: u64,
    pub files: u64,
}
