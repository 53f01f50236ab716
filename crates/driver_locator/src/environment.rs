/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use std::sync::Arc;

use crate::common::{cell::CellIndexer, types::*};
use crate::storage::{
    baseline::BaselineRadiusIndex, redis::RedisKv, sharded::ShardedLocationStore, LocationKv,
};
use reqwest::Url;
use serde::Deserialize;
use shared::redis::types::{RedisConnectionPool, RedisSettings};
use shared::utils::logger::LoggerConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub redis_cfg: RedisConfig,
    pub search_mode: SearchMode,
    pub shard_count: u32,
    pub coarse_cell_resolution: usize,
    pub fine_cell_resolution: usize,
    pub location_expiry_seconds: u32,
    pub baseline_fetch_cap: u64,
    pub fallback_batch_size: usize,
    pub max_ring_expansion: u32,
    pub prefer_real_drivers: bool,
    pub fallback_driver_rating: f64,
    pub default_search_count: usize,
    pub store_timeout_ms: u64,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
    pub profile_service_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_pool_size: usize,
    pub redis_partition: usize,
    pub reconnect_max_attempts: u32,
    pub reconnect_delay: u32,
    pub default_ttl: u32,
}

/// Knobs of the two search strategies, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub default_search_count: usize,
    pub baseline_fetch_cap: u64,
    pub fallback_batch_size: usize,
    pub max_ring_expansion: u32,
    pub prefer_real_drivers: bool,
    pub fallback_driver_rating: Rating,
}

#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn LocationKv>,
    pub sharded_store: Arc<ShardedLocationStore>,
    pub baseline_index: Arc<BaselineRadiusIndex>,
    pub indexer: CellIndexer,
    pub search_cfg: SearchConfig,
    pub profile_service_url: Option<Url>,
    pub location_expiry_seconds: u32,
    pub request_timeout: u64,
    pub max_allowed_req_size: usize,
}

impl AppState {
    pub async fn new(app_config: AppConfig) -> AppState {
        let redis_pool = Arc::new(
            RedisConnectionPool::new(&RedisSettings {
                host: app_config.redis_cfg.redis_host.clone(),
                port: app_config.redis_cfg.redis_port,
                pool_size: app_config.redis_cfg.redis_pool_size,
                partition: app_config.redis_cfg.redis_partition,
                reconnect_max_attempts: app_config.redis_cfg.reconnect_max_attempts,
                reconnect_delay: app_config.redis_cfg.reconnect_delay,
                default_ttl: app_config.redis_cfg.default_ttl,
                ..RedisSettings::default()
            })
            .await
            .expect("Failed to create Redis connection pool"),
        );

        let kv: Arc<dyn LocationKv> =
            Arc::new(RedisKv::new(redis_pool, app_config.store_timeout_ms));

        Self::with_kv(&app_config, kv)
    }

    /// Wires the engine over an already-built storage backend. The tests
    /// crate uses this with the in-memory backend.
    pub fn with_kv(app_config: &AppConfig, kv: Arc<dyn LocationKv>) -> AppState {
        let indexer = CellIndexer::new(
            app_config.coarse_cell_resolution,
            app_config.fine_cell_resolution,
            app_config.shard_count,
        );

        let sharded_store = Arc::new(ShardedLocationStore::new(
            kv.clone(),
            indexer,
            app_config.location_expiry_seconds,
        ));
        let baseline_index = Arc::new(BaselineRadiusIndex::new(kv.clone()));

        let profile_service_url = app_config.profile_service_url.as_ref().map(|url| {
            Url::parse(url.as_str()).expect("Failed to parse profile_service_url.")
        });

        AppState {
            kv,
            sharded_store,
            baseline_index,
            indexer,
            search_cfg: SearchConfig {
                mode: app_config.search_mode,
                default_search_count: app_config.default_search_count,
                baseline_fetch_cap: app_config.baseline_fetch_cap,
                fallback_batch_size: app_config.fallback_batch_size,
                max_ring_expansion: app_config.max_ring_expansion,
                prefer_real_drivers: app_config.prefer_real_drivers,
                fallback_driver_rating: Rating(app_config.fallback_driver_rating),
            },
            profile_service_url,
            location_expiry_seconds: app_config.location_expiry_seconds,
            request_timeout: app_config.request_timeout,
            max_allowed_req_size: app_config.max_allowed_req_size,
        }
    }
}
