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
use driver_locator::domain::action::ui::location::update_driver_location;
use driver_locator::domain::types::internal::location::NearbyDriversRequest;
use driver_locator::domain::types::ui::location::UpdateLocationRequest;
use driver_locator::environment::AppState;
use driver_locator::storage::keys::{driver_bucket_key, driver_details_key};
use driver_locator::storage::memory::MemoryKv;
use driver_locator::storage::LocationKv;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

async fn report_location(data: &actix_web::web::Data<AppState>, id: &str, lat: f64, lon: f64) {
    update_driver_location(
        data.clone(),
        UpdateLocationRequest {
            driver_id: driver(id),
            latitude: Latitude(lat),
            longitude: Longitude(lon),
        },
    )
    .await
    .expect("location update failed");
}

async fn nearby_ids(
    data: &actix_web::web::Data<AppState>,
    lat: f64,
    lon: f64,
    radius_km: f64,
    count: Option<u32>,
    mode: SearchMode,
) -> Vec<String> {
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
    .into_iter()
    .map(|entry| entry.driver_id.0)
    .collect()
}

#[tokio::test]
async fn upserted_driver_is_discoverable_at_its_own_position() {
    let config = test_config();
    let data = memory_state();

    report_location(&data, "d1", 10.7626, 106.6826).await;

    // A zero-hop search anchored on the very same point must see the driver
    let mut zero_ring_config = config;
    zero_ring_config.max_ring_expansion = 0;
    let data = state_with(&zero_ring_config, data.kv.clone());

    let ids = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert_eq!(ids, vec!["d1".to_string()]);
}

#[tokio::test]
async fn migrating_driver_leaves_its_old_bucket() {
    let mut config = test_config();
    config.max_ring_expansion = 0;
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let data = state_with(&config, kv.clone());

    report_location(&data, "d1", 10.0, 106.0).await;
    report_location(&data, "d1", 10.1, 106.1).await;

    let old = nearby_ids(&data, 10.0, 106.0, 1.0, None, SearchMode::Sharded).await;
    assert!(old.is_empty(), "driver still visible at the old cell");

    let new = nearby_ids(&data, 10.1, 106.1, 1.0, None, SearchMode::Sharded).await;
    assert_eq!(new, vec!["d1".to_string()]);

    // Membership really moved; the old bucket no longer lists the driver
    let indexer = CellIndexer::new(
        config.coarse_cell_resolution,
        config.fine_cell_resolution,
        config.shard_count,
    );
    let old_cell = indexer
        .fine_cell(&Latitude(10.0), &Longitude(106.0))
        .unwrap();
    let old_shard = indexer
        .shard_for(&Latitude(10.0), &Longitude(106.0))
        .unwrap();
    let members = kv
        .ztop_scores_batch(&[driver_bucket_key(&old_shard, &old_cell)], 10)
        .await
        .unwrap();
    assert!(members[0].is_empty());
}

#[tokio::test]
async fn metadata_is_the_source_of_truth_for_the_current_bucket() {
    let data = memory_state();

    report_location(&data, "d1", 10.0, 106.0).await;
    report_location(&data, "d1", 10.1, 106.1).await;

    let record = data
        .sharded_store
        .metadata(&driver("d1"))
        .await
        .unwrap()
        .expect("metadata missing");

    let indexer = CellIndexer::new(5, 7, 4);
    assert_eq!(
        record.cell,
        indexer
            .fine_cell(&Latitude(10.1), &Longitude(106.1))
            .unwrap()
    );
    assert_eq!(
        record.shard,
        indexer
            .shard_for(&Latitude(10.1), &Longitude(106.1))
            .unwrap()
    );
}

#[tokio::test]
async fn locations_expire_after_their_ttl() {
    let mut config = test_config();
    config.location_expiry_seconds = 1;
    let data = state_with(&config, Arc::new(MemoryKv::new()));

    report_location(&data, "d1", 10.7626, 106.6826).await;
    assert_eq!(
        nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await,
        vec!["d1".to_string()]
    );

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let after = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert!(after.is_empty(), "driver outlived its TTL");
    assert!(data
        .sharded_store
        .metadata(&driver("d1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn expired_metadata_behind_a_live_bucket_is_tolerated() {
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let data = state_with(&test_config(), kv.clone());

    report_location(&data, "d1", 10.7626, 106.6826).await;

    // Simulate the bucket outliving the metadata record by expiring the
    // record out from under the membership
    kv.set_with_expiry(&driver_details_key(&driver("d1")), "{}".to_string(), 0)
        .await
        .unwrap();

    let ids = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert!(ids.is_empty(), "stale member should be skipped, not returned");
}

#[tokio::test]
async fn failing_bucket_reads_degrade_to_an_empty_result() {
    let kv: Arc<FlakyKv> = Arc::new(FlakyKv::new());
    let data = state_with(&test_config(), kv.clone());

    report_location(&data, "d1", 10.7626, 106.6826).await;

    kv.fail_bucket_reads.store(true, Ordering::SeqCst);
    let ids = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert!(ids.is_empty());

    kv.fail_bucket_reads.store(false, Ordering::SeqCst);
    let ids = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert_eq!(ids, vec!["d1".to_string()]);
}

#[tokio::test]
async fn failing_metadata_reads_degrade_to_an_empty_result() {
    let kv: Arc<FlakyKv> = Arc::new(FlakyKv::new());
    let data = state_with(&test_config(), kv.clone());

    report_location(&data, "d1", 10.7626, 106.6826).await;

    kv.fail_metadata_reads.store(true, Ordering::SeqCst);
    let ids = nearby_ids(&data, 10.7626, 106.6826, 1.0, None, SearchMode::Sharded).await;
    assert!(ids.is_empty());
}

#[tokio::test]
async fn invalid_searches_are_rejected_before_any_store_call() {
    let data = memory_state();

    for (lat, lon, radius) in [
        (f64::NAN, 106.0, 1.0),
        (10.0, f64::INFINITY, 1.0),
        (95.0, 106.0, 1.0),
        (10.0, 200.0, 1.0),
        (10.0, 106.0, 0.0),
        (10.0, 106.0, -1.0),
        (10.0, 106.0, f64::NAN),
    ] {
        for mode in [SearchMode::Baseline, SearchMode::Sharded] {
            let result = get_nearby_drivers(
                data.clone(),
                NearbyDriversRequest {
                    latitude: Latitude(lat),
                    longitude: Longitude(lon),
                    radius_km: Radius(radius),
                    count: None,
                    mode: Some(mode),
                },
            )
            .await;
            assert!(result.is_err(), "({lat},{lon},{radius}) should be rejected");
        }
    }
}

#[tokio::test]
async fn invalid_location_updates_are_rejected() {
    let data = memory_state();

    let result = update_driver_location(
        data.clone(),
        UpdateLocationRequest {
            driver_id: driver(""),
            latitude: Latitude(10.0),
            longitude: Longitude(106.0),
        },
    )
    .await;
    assert!(result.is_err());

    let result = update_driver_location(
        data.clone(),
        UpdateLocationRequest {
            driver_id: driver("d1"),
            latitude: Latitude(120.0),
            longitude: Longitude(106.0),
        },
    )
    .await;
    assert!(result.is_err());
}
