/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::{keys::*, LocationKv};
use crate::common::{cell::CellIndexer, types::*};
use chrono::Utc;
use rustc_hash::FxHashMap;
use shared::tools::error::AppError;
use shared::utils::logger::*;
use std::sync::Arc;

/// One rating-ordered bucket per (shard, fine cell) pair plus a per-driver
/// metadata record, all expiring together. Buckets come into existence on
/// first insert and vanish when their TTL lapses; expiry is the only
/// staleness eviction there is.
pub struct ShardedLocationStore {
    kv: Arc<dyn LocationKv>,
    indexer: CellIndexer,
    location_expiry_secs: u32,
}

impl ShardedLocationStore {
    pub fn new(kv: Arc<dyn LocationKv>, indexer: CellIndexer, location_expiry_secs: u32) -> Self {
        Self {
            kv,
            indexer,
            location_expiry_secs,
        }
    }

    /// Places the driver in the bucket for its current fine cell, rating as
    /// the rank, and refreshes the metadata record under the same TTL.
    pub async fn upsert(
        &self,
        driver_id: &DriverId,
        location: &Point,
        rating: &Rating,
    ) -> Result<DriverLocationRecord, AppError> {
        let cell = self.indexer.fine_cell(&location.lat, &location.lon)?;
        let shard = self.indexer.shard_for(&location.lat, &location.lon)?;

        let bucket = driver_bucket_key(&shard, &cell);
        self.kv
            .zadd_with_expiry(&bucket, &driver_id.0, rating.0, self.location_expiry_secs)
            .await?;

        let record = DriverLocationRecord {
            location: *location,
            rating: *rating,
            cell,
            shard,
            updated_at: TimeStamp(Utc::now()),
        };
        let value = serde_json::to_string(&record)
            .map_err(|err| AppError::SerializationError(err.to_string()))?;
        self.kv
            .set_with_expiry(
                &driver_details_key(driver_id),
                value,
                self.location_expiry_secs,
            )
            .await?;

        Ok(record)
    }

    /// Drops bucket membership only. The metadata record is left to expire
    /// on its own; `upsert` is the only writer of metadata.
    pub async fn remove(&self, bucket_key: &str, driver_id: &DriverId) -> Result<(), AppError> {
        self.kv.zrem(bucket_key, &driver_id.0).await
    }

    pub async fn metadata(
        &self,
        driver_id: &DriverId,
    ) -> Result<Option<DriverLocationRecord>, AppError> {
        match self.kv.get(&driver_details_key(driver_id)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| AppError::DeserializationError(err.to_string())),
            None => Ok(None),
        }
    }

    /// Top `n` drivers by rating for every requested bucket, one batched
    /// round trip. Buckets that are missing, expired or failing come back
    /// as empty lists, never as an error.
    pub async fn top_n_per_bucket(
        &self,
        bucket_keys: &[String],
        n: usize,
    ) -> Result<FxHashMap<String, Vec<(DriverId, Rating)>>, AppError> {
        let per_bucket = self.kv.ztop_scores_batch(bucket_keys, n).await?;

        Ok(bucket_keys
            .iter()
            .cloned()
            .zip(per_bucket.into_iter().map(|members| {
                members
                    .into_iter()
                    .map(|(member, score)| (DriverId(member), Rating(score)))
                    .collect()
            }))
            .collect())
    }

    /// Metadata for a batch of drivers in one round trip. Entries whose
    /// record has expired are simply absent; a bucket can briefly reference
    /// a driver whose metadata is already gone and that is tolerated.
    pub async fn metadata_batch(
        &self,
        driver_ids: &[DriverId],
    ) -> Result<FxHashMap<DriverId, DriverLocationRecord>, AppError> {
        let detail_keys: Vec<String> = driver_ids.iter().map(driver_details_key).collect();
        let raw_records = self.kv.mget(&detail_keys).await?;

        let mut records = FxHashMap::default();
        for (driver_id, raw) in driver_ids.iter().zip(raw_records) {
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<DriverLocationRecord>(&raw) {
                Ok(record) => {
                    records.insert(driver_id.clone(), record);
                }
                Err(err) => {
                    warn!(
                        tag = "[Corrupt Driver Record]",
                        driver_id = %driver_id.0,
                        "Dropping undecodable metadata record: {err}"
                    );
                }
            }
        }
        Ok(records)
    }
}
