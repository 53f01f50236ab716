/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod baseline;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod sharded;

use async_trait::async_trait;
use shared::tools::error::AppError;

/// The command surface the locator engine needs from its expiring key-value
/// store. All location state lives behind this seam; the production backend
/// is Redis, the in-memory backend serves tests and local development.
///
/// The two batched reads (`ztop_scores_batch`, `mget`) must be a single
/// round trip per call, never one round trip per key.
#[async_trait]
pub trait LocationKv: Send + Sync {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        expiry_secs: u32,
    ) -> Result<(), AppError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Batched get. The result has one entry per requested key, in order;
    /// missing or expired keys come back as `None`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, AppError>;

    /// Adds (or rescores) a member in a sorted set and refreshes the set's
    /// expiry.
    async fn zadd_with_expiry(
        &self,
        key: &str,
        member: &str,
        score: f64,
        expiry_secs: u32,
    ) -> Result<(), AppError>;

    async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError>;

    /// Top `count` members by score descending for every key, one round
    /// trip for the whole batch. Missing or expired keys yield empty lists.
    async fn ztop_scores_batch(
        &self,
        keys: &[String],
        count: usize,
    ) -> Result<Vec<Vec<(String, f64)>>, AppError>;

    async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> Result<(), AppError>;

    /// Members within `radius_km` of the origin, ascending by distance,
    /// optionally capped at `count`.
    async fn geo_search(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        count: Option<u64>,
    ) -> Result<Vec<(String, f64)>, AppError>;
}
