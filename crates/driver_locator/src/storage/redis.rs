/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::LocationKv;
use async_trait::async_trait;
use shared::redis::types::RedisConnectionPool;
use shared::tools::error::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Redis-backed implementation of the storage seam. Every call is one
/// command (or one pipeline) against the pool, bounded by the configured
/// round-trip deadline. Deadline hits surface as `StoreTimeout`; the engine
/// decides how to degrade, this layer never retries.
pub struct RedisKv {
    pool: Arc<RedisConnectionPool>,
    round_trip_deadline: Duration,
}

impl RedisKv {
    pub fn new(pool: Arc<RedisConnectionPool>, round_trip_deadline_ms: u64) -> Self {
        Self {
            pool,
            round_trip_deadline: Duration::from_millis(round_trip_deadline_ms),
        }
    }

    async fn deadline_bound<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.round_trip_deadline, fut)
            .await
            .map_err(|_| AppError::StoreTimeout)?
    }
}

#[async_trait]
impl LocationKv for RedisKv {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        expiry_secs: u32,
    ) -> Result<(), AppError> {
        self.deadline_bound(self.pool.set_with_expiry(key, &value, expiry_secs))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.deadline_bound(self.pool.get_key(key)).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, AppError> {
        self.deadline_bound(self.pool.mget_keys(keys.to_vec()))
            .await
    }

    async fn zadd_with_expiry(
        &self,
        key: &str,
        member: &str,
        score: f64,
        expiry_secs: u32,
    ) -> Result<(), AppError> {
        self.deadline_bound(async {
            self.pool.zadd(key, vec![(score, member)]).await?;
            self.pool.set_expiry(key, expiry_secs.into()).await
        })
        .await
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        self.deadline_bound(self.pool.zrem(key, member)).await
    }

    async fn ztop_scores_batch(
        &self,
        keys: &[String],
        count: usize,
    ) -> Result<Vec<Vec<(String, f64)>>, AppError> {
        self.deadline_bound(self.pool.ztop_scores_batch(keys, count))
            .await
    }

    async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> Result<(), AppError> {
        self.deadline_bound(self.pool.geo_add(key, longitude, latitude, member))
            .await
    }

    async fn geo_search(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        count: Option<u64>,
    ) -> Result<Vec<(String, f64)>, AppError> {
        self.deadline_bound(
            self.pool
                .geo_search(key, longitude, latitude, radius_km, count),
        )
        .await
    }
}
