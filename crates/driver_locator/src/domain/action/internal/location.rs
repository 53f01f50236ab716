/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::time::Instant;

use crate::common::{cell::CellIndexer, types::*, utils::distance_between_in_km};
use crate::domain::types::internal::location::*;
use crate::environment::{AppState, SearchConfig};
use crate::storage::{
    baseline::BaselineRadiusIndex, keys::driver_bucket_key, sharded::ShardedLocationStore,
};
use crate::tools::prometheus::{NEARBY_SEARCH_DURATION, RING_EXPANSION_DEPTH};
use actix_web::web::Data;
use rustc_hash::FxHashSet;
use shared::tools::error::AppError;
use shared::utils::logger::*;

/// Two distances closer than this are considered a tie and ranked by rating
/// instead.
const DISTANCE_TIE_EPSILON_KM: f64 = 0.001;

struct Candidate {
    driver_id: DriverId,
    distance_km: f64,
    rating: Rating,
}

#[macros::measure_duration]
pub async fn get_nearby_drivers(
    data: Data<AppState>,
    request: NearbyDriversRequest,
) -> Result<NearbyDriverResponse, AppError> {
    request.validate()?;

    let mode = request.mode.unwrap_or(data.search_cfg.mode);
    let requested = request
        .count
        .filter(|count| *count > 0)
        .map(|count| count as usize)
        .unwrap_or(data.search_cfg.default_search_count);
    let origin = Point {
        lat: request.latitude,
        lon: request.longitude,
    };

    let start = Instant::now();
    let drivers = match mode {
        SearchMode::Baseline => {
            baseline_search(
                &data.baseline_index,
                &data.search_cfg,
                &origin,
                &request.radius_km,
                requested,
            )
            .await?
        }
        SearchMode::Sharded => {
            ring_expansion_search(
                &data.sharded_store,
                &data.indexer,
                &data.search_cfg,
                &origin,
                &request.radius_km,
                requested,
            )
            .await?
        }
    };

    NEARBY_SEARCH_DURATION
        .with_label_values(&[mode.to_string().as_str()])
        .observe(start.elapsed().as_secs_f64());

    Ok(NearbyDriverResponse { drivers })
}

/// The unoptimized strategy: one bulk radius query with a deliberately
/// large over-fetch cap, so its cost tracks the total entity density inside
/// the radius. When the prefer-real policy is on, real drivers fill the
/// response first and synthetic load-test drivers only pad the remainder.
async fn baseline_search(
    index: &BaselineRadiusIndex,
    cfg: &SearchConfig,
    origin: &Point,
    radius: &Radius,
    requested: usize,
) -> Result<Vec<NearbyDriver>, AppError> {
    let hits = index
        .search_within_radius(origin, radius, Some(cfg.baseline_fetch_cap))
        .await
        .map_err(|err| match err {
            AppError::InvalidRequest(message) => AppError::InvalidRequest(message),
            err => AppError::SearchUnavailable(err.to_string()),
        })?;

    let ranked: Vec<(DriverId, f64)> = if cfg.prefer_real_drivers {
        let (real, synthetic): (Vec<_>, Vec<_>) = hits
            .into_iter()
            .partition(|(driver_id, _)| !driver_id.is_synthetic());
        real.into_iter()
            .chain(synthetic)
            .take(requested)
            .collect()
    } else {
        hits.into_iter().take(requested).collect()
    };

    Ok(ranked
        .into_iter()
        .map(|(driver_id, distance_km)| NearbyDriver {
            driver_id,
            distance_km,
        })
        .collect())
}

/// The optimized strategy: expand k-rings of fine cells around the origin,
/// reading each new ring's buckets in one batched round trip, until enough
/// drivers are found or the ring cap is hit. The cap is fixed and does not
/// scale with the requested radius, so a very large radius can under-return.
async fn ring_expansion_search(
    store: &ShardedLocationStore,
    indexer: &CellIndexer,
    cfg: &SearchConfig,
    origin: &Point,
    radius: &Radius,
    requested: usize,
) -> Result<Vec<NearbyDriver>, AppError> {
    let origin_cell = indexer.fine_cell(&origin.lat, &origin.lon)?;

    let mut queried_cells: FxHashSet<CellId> = FxHashSet::default();
    let mut seen_drivers: FxHashSet<DriverId> = FxHashSet::default();
    let mut found: Vec<Candidate> = Vec::new();
    let mut depth = 0;

    for k in 0..=cfg.max_ring_expansion {
        depth = k;

        let ring = indexer.ring_neighbors(&origin_cell, k)?;
        let new_cells: Vec<CellId> = ring
            .into_iter()
            .filter(|cell| !queried_cells.contains(cell))
            .collect();
        if new_cells.is_empty() {
            continue;
        }

        // A ring can straddle shard boundaries, so every cell's shard is
        // derived from its own center, never inherited from the origin.
        let mut bucket_keys = Vec::with_capacity(new_cells.len());
        for cell in new_cells {
            let center = indexer.cell_center(&cell)?;
            let shard = indexer.shard_for(&center.lat, &center.lon)?;
            bucket_keys.push(driver_bucket_key(&shard, &cell));
            queried_cells.insert(cell);
        }

        let remaining = requested.saturating_sub(found.len());
        let batch_size = per_bucket_batch_size(remaining, bucket_keys.len(), cfg);

        let buckets = match store.top_n_per_bucket(&bucket_keys, batch_size).await {
            Ok(buckets) => buckets,
            Err(err) => {
                warn!(
                    tag = "[Degraded Ring Fetch]",
                    ring = k,
                    "Treating unreadable buckets as empty: {err}"
                );
                continue;
            }
        };

        let mut candidates: Vec<(DriverId, Rating)> = Vec::new();
        for (driver_id, rating) in buckets.into_values().flatten() {
            if seen_drivers.insert(driver_id.clone()) {
                candidates.push((driver_id, rating));
            }
        }
        if candidates.is_empty() {
            continue;
        }

        let candidate_ids: Vec<DriverId> = candidates
            .iter()
            .map(|(driver_id, _)| driver_id.clone())
            .collect();
        let records = match store.metadata_batch(&candidate_ids).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    tag = "[Degraded Metadata Fetch]",
                    ring = k,
                    "Dropping candidates with unreadable metadata: {err}"
                );
                continue;
            }
        };

        for (driver_id, rating) in candidates {
            // Bucket membership can outlive the metadata record by a round
            // trip; such drivers are treated as currently unknown.
            let Some(record) = records.get(&driver_id) else {
                continue;
            };
            let distance_km = distance_between_in_km(origin, &record.location);
            if distance_km <= radius.0 {
                found.push(Candidate {
                    driver_id,
                    distance_km,
                    rating,
                });
            }
        }

        if found.len() >= requested {
            break;
        }
    }

    RING_EXPANSION_DEPTH.observe(f64::from(depth));

    rank_candidates(&mut found);
    found.truncate(requested);

    Ok(found
        .into_iter()
        .map(|candidate| NearbyDriver {
            driver_id: candidate.driver_id,
            distance_km: candidate.distance_km,
        })
        .collect())
}

/// Bounds over-fetching as the result set fills up: spread the remaining
/// need across the new buckets, never below one per bucket and never above
/// the configured fallback batch size.
fn per_bucket_batch_size(remaining: usize, new_bucket_count: usize, cfg: &SearchConfig) -> usize {
    remaining
        .div_ceil(new_bucket_count.max(1))
        .min(cfg.fallback_batch_size)
        .max(1)
}

/// Ascending by distance, with distances closer than the tie epsilon
/// falling into the same rank and ordered by rating descending. Quantizing
/// keeps the comparator a total order.
fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        let da = (a.distance_km / DISTANCE_TIE_EPSILON_KM).round() as i64;
        let db = (b.distance_km / DISTANCE_TIE_EPSILON_KM).round() as i64;
        da.cmp(&db)
            .then_with(|| b.rating.0.total_cmp(&a.rating.0))
    });
}
