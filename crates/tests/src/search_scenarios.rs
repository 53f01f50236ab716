/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::support::*;
use driver_locator::common::cell::CellIndexer;
use driver_locator::common::types::*;
use driver_locator::domain::action::internal::location::get_nearby_drivers;
use driver_locator::domain::types::internal::location::{NearbyDriver, NearbyDriversRequest};
use driver_locator::environment::AppState;
use driver_locator::storage::keys::driver_bucket_key;
use driver_locator::storage::memory::MemoryKv;
use std::sync::Arc;

async fn seed_rated_driver(
    data: &actix_web::web::Data<AppState>,
    id: &str,
    lat: f64,
    lon: f64,
    rating: f64,
) {
    let location = point(lat, lon);
    data.sharded_store
        .upsert(&driver(id), &location, &Rating(rating))
        .await
        .expect("seed upsert failed");
    data.baseline_index
        .add(&driver(id), &location)
        .await
        .expect("seed geo add failed");
}

async fn search(
    data: &actix_web::web::Data<AppState>,
    lat: f64,
    lon: f64,
    radius_km: f64,
    count: Option<u32>,
    mode: SearchMode,
) -> Vec<NearbyDriver> {
    get_nearby_drivers(
        data.clone(),
        NearbyDriversRequest {
            latitude: Latitude(lat),
            longitude: Longitude(lon),
            radius_km: Radius(radius_km),
            count,
            mode: Some(mode),
        },
    )
    .await
    .expect("search failed")
    .drivers
}

#[tokio::test]
async fn two_closest_of_three_seeded_drivers() {
    let data = memory_state();

    seed_rated_driver(&data, "d1", 10.7626, 106.6826, 4.9).await;
    seed_rated_driver(&data, "d2", 10.7646, 106.6822, 4.7).await;
    seed_rated_driver(&data, "d3", 10.7656, 106.6842, 4.5).await;

    let drivers = search(&data, 10.7626, 106.6826, 2.0, Some(2), SearchMode::Sharded).await;

    assert_eq!(drivers.len(), 2);
    assert_eq!(drivers[0].driver_id.0, "d1");
    assert!(drivers[0].distance_km < 0.001, "seed driver is at the origin");
    assert_eq!(
        drivers[1].driver_id.0, "d2",
        "the nearer of the remaining two wins"
    );
    assert!((drivers[1].distance_km - 0.2266).abs() < 0.01);
}

#[tokio::test]
async fn moved_driver_is_only_found_at_its_new_position() {
    let data = memory_state();

    seed_rated_driver(&data, "d1", 10.0, 106.0, 4.5).await;
    // Second report from a different cell migrates the driver
    seed_rated_driver(&data, "d1", 10.1, 106.1, 4.5).await;
    let indexer = CellIndexer::new(5, 7, 4);
    let old_cell = indexer
        .fine_cell(&Latitude(10.0), &Longitude(106.0))
        .unwrap();
    let old_shard = indexer
        .shard_for(&Latitude(10.0), &Longitude(106.0))
        .unwrap();
    data.sharded_store
        .remove(&driver_bucket_key(&old_shard, &old_cell), &driver("d1"))
        .await
        .unwrap();

    for mode in [SearchMode::Baseline, SearchMode::Sharded] {
        let at_old = search(&data, 10.0, 106.0, 1.0, None, mode).await;
        assert!(at_old.is_empty(), "{mode:?} still returns the old position");

        let at_new = search(&data, 10.1, 106.1, 1.0, None, mode).await;
        assert_eq!(at_new.len(), 1);
        assert_eq!(at_new[0].driver_id.0, "d1");
    }
}

#[tokio::test]
async fn early_exit_queries_no_bucket_beyond_ring_zero() {
    let config = test_config();
    let kv: Arc<RecordingKv> = Arc::new(RecordingKv::new());
    let data = state_with(&config, kv.clone());

    // Three drivers in the origin's own cell, anchored on the cell center
    let indexer = CellIndexer::new(5, 7, 4);
    let origin_cell = indexer
        .fine_cell(&Latitude(10.7626), &Longitude(106.6826))
        .unwrap();
    let center = indexer.cell_center(&origin_cell).unwrap();
    let Latitude(center_lat) = center.lat;
    let Longitude(center_lon) = center.lon;

    for (id, rating) in [("d1", 4.9), ("d2", 4.7), ("d3", 4.5)] {
        seed_rated_driver(&data, id, center_lat, center_lon, rating).await;
    }

    let drivers = search(&data, center_lat, center_lon, 2.0, Some(2), SearchMode::Sharded).await;
    assert_eq!(drivers.len(), 2);

    let origin_shard = indexer.shard_for(&center.lat, &center.lon).unwrap();
    let ring_zero_bucket = driver_bucket_key(&origin_shard, &origin_cell);

    let batches = kv.recorded_batches();
    assert_eq!(batches.len(), 1, "only the ring-0 batch may be issued");
    assert_eq!(batches[0], vec![ring_zero_bucket]);
}

#[tokio::test]
async fn ring_results_are_monotonic_in_the_expansion_cap() {
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let seed_data = state_with(&test_config(), kv.clone());

    // A line of drivers marching away from the origin
    for (i, offset) in [0.0, 0.002, 0.004, 0.006, 0.008, 0.012].iter().enumerate() {
        seed_rated_driver(&seed_data, &format!("d{i}"), 10.7626 + offset, 106.6826, 4.5).await;
    }

    let mut previous: Vec<String> = Vec::new();
    for cap in 0..=5 {
        let mut config = test_config();
        config.max_ring_expansion = cap;
        let data = state_with(&config, kv.clone());

        // Large count so early exit never truncates the comparison
        let mut ids: Vec<String> =
            search(&data, 10.7626, 106.6826, 5.0, Some(100), SearchMode::Sharded)
                .await
                .into_iter()
                .map(|entry| entry.driver_id.0)
                .collect();
        ids.sort();

        for id in &previous {
            assert!(
                ids.contains(id),
                "ring cap {cap} lost driver {id} found at cap {}",
                cap - 1
            );
        }
        previous = ids;
    }
}

#[tokio::test]
async fn drivers_beyond_the_radius_are_filtered_out() {
    let data = memory_state();

    seed_rated_driver(&data, "near", 10.7626, 106.6826, 4.5).await;
    // ~550 m north, reachable by ring expansion but outside the radius
    seed_rated_driver(&data, "too_far", 10.7676, 106.6826, 4.9).await;

    let drivers = search(&data, 10.7626, 106.6826, 0.3, None, SearchMode::Sharded).await;
    let ids: Vec<&str> = drivers.iter().map(|d| d.driver_id.0.as_str()).collect();
    assert_eq!(ids, vec!["near"]);
}

#[tokio::test]
async fn equal_distances_rank_by_rating() {
    let data = memory_state();

    seed_rated_driver(&data, "steady", 10.7626, 106.6826, 4.1).await;
    seed_rated_driver(&data, "star", 10.7626, 106.6826, 4.9).await;

    let drivers = search(&data, 10.7626, 106.6826, 1.0, Some(2), SearchMode::Sharded).await;
    let ids: Vec<&str> = drivers.iter().map(|d| d.driver_id.0.as_str()).collect();
    assert_eq!(ids, vec!["star", "steady"]);
}

#[tokio::test]
async fn scarce_supply_returns_a_short_result_not_an_error() {
    let data = memory_state();

    seed_rated_driver(&data, "only_one", 10.7626, 106.6826, 4.5).await;

    let drivers = search(&data, 10.7626, 106.6826, 2.0, Some(5), SearchMode::Sharded).await;
    assert_eq!(drivers.len(), 1);

    let nobody = search(&data, -33.86, 151.2, 2.0, Some(5), SearchMode::Sharded).await;
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn baseline_prefers_real_drivers_over_synthetic_load() {
    let data = memory_state();

    // Ghosts sit right on the origin, the real driver is farther out
    for i in 0..3 {
        data.baseline_index
            .add(&driver(&format!("ghost:{i}")), &point(10.7626, 106.6826))
            .await
            .unwrap();
    }
    data.baseline_index
        .add(&driver("real_1"), &point(10.7646, 106.6822))
        .await
        .unwrap();

    let drivers = search(&data, 10.7626, 106.6826, 2.0, Some(2), SearchMode::Baseline).await;
    assert_eq!(drivers.len(), 2);
    assert_eq!(drivers[0].driver_id.0, "real_1");
    assert!(drivers[1].driver_id.0.starts_with("ghost:"));
}

#[tokio::test]
async fn baseline_raw_ranking_when_prefer_real_is_off() {
    let mut config = test_config();
    config.prefer_real_drivers = false;
    let data = state_with(&config, Arc::new(MemoryKv::new()));

    for i in 0..3 {
        data.baseline_index
            .add(&driver(&format!("ghost:{i}")), &point(10.7626, 106.6826))
            .await
            .unwrap();
    }
    data.baseline_index
        .add(&driver("real_1"), &point(10.7646, 106.6822))
        .await
        .unwrap();

    let drivers = search(&data, 10.7626, 106.6826, 2.0, Some(2), SearchMode::Baseline).await;
    assert_eq!(drivers.len(), 2);
    assert!(
        drivers.iter().all(|d| d.driver_id.0.starts_with("ghost:")),
        "raw slice is purely distance-ranked"
    );
}

#[tokio::test]
async fn sharded_search_stays_bounded_under_a_dense_cluster() {
    use rand::Rng;

    // Worst case for the bulk scan: hundreds of drivers packed into a few
    // hundred meters. The sharded path must keep its fetch volume bounded
    // by the ring cap and the adaptive batch size.
    let kv: Arc<RecordingKv> = Arc::new(RecordingKv::new());
    let data = state_with(&test_config(), kv.clone());

    let mut rng = rand::thread_rng();
    for i in 0..200 {
        let lat = 10.8185 + rng.gen_range(-0.0025..0.0025);
        let lon = 106.6588 + rng.gen_range(-0.0025..0.0025);
        let rating = 4.0 + rng.gen_range(0.0..1.0);
        seed_rated_driver(&data, &format!("ghost:{i}"), lat, lon, rating).await;
    }

    let drivers = search(&data, 10.8185, 106.6588, 2.0, Some(5), SearchMode::Sharded).await;
    assert_eq!(drivers.len(), 5);

    let batches = kv.recorded_batches();
    assert!(
        batches.len() <= 6,
        "at most one batched round trip per ring, got {}",
        batches.len()
    );
}

#[tokio::test]
async fn both_strategies_agree_on_a_simple_neighborhood() {
    let data = memory_state();

    seed_rated_driver(&data, "d1", 10.7626, 106.6826, 4.9).await;
    seed_rated_driver(&data, "d2", 10.7646, 106.6822, 4.7).await;
    seed_rated_driver(&data, "d3", 10.7656, 106.6842, 4.5).await;

    let baseline = search(&data, 10.7626, 106.6826, 2.0, Some(3), SearchMode::Baseline).await;
    let sharded = search(&data, 10.7626, 106.6826, 2.0, Some(3), SearchMode::Sharded).await;

    let baseline_ids: Vec<&str> = baseline.iter().map(|d| d.driver_id.0.as_str()).collect();
    let sharded_ids: Vec<&str> = sharded.iter().map(|d| d.driver_id.0.as_str()).collect();
    assert_eq!(baseline_ids, sharded_ids);

    for (b, s) in baseline.iter().zip(sharded.iter()) {
        assert!(
            (b.distance_km - s.distance_km).abs() / s.distance_km.max(0.001) < 0.01,
            "strategy distances diverge for {}",
            b.driver_id.0
        );
    }
}
