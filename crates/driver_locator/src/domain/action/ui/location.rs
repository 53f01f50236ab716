/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::types::ui::location::UpdateLocationRequest;
use crate::environment::AppState;
use crate::outbound::profile::fetch_driver_rating;
use crate::storage::keys::driver_bucket_key;
use actix_web::web::Data;
use shared::tools::error::AppError;
use shared::utils::logger::*;

/// Applies one driver position report to both indexes: detects bucket
/// migration against the current metadata record, moves the membership,
/// refreshes metadata, and mirrors the coordinate into the baseline index
/// so either search strategy sees every update.
#[macros::measure_duration]
pub async fn update_driver_location(
    data: Data<AppState>,
    request: UpdateLocationRequest,
) -> Result<APISuccess, AppError> {
    request.validate()?;

    let UpdateLocationRequest {
        driver_id,
        latitude,
        longitude,
    } = request;
    let location = Point {
        lat: latitude,
        lon: longitude,
    };

    let new_cell = data.indexer.fine_cell(&latitude, &longitude)?;

    // The metadata record is the single source of truth for which bucket
    // currently holds the driver; it is consulted before every migration.
    let current = data.sharded_store.metadata(&driver_id).await?;

    let rating = match &current {
        Some(record) => record.rating,
        None => resolve_driver_rating(&data, &driver_id).await,
    };

    if let Some(record) = current {
        if record.cell != new_cell {
            // A reader can observe the driver in neither bucket for one
            // round trip here; that staleness window is accepted.
            let old_bucket = driver_bucket_key(&record.shard, &record.cell);
            data.sharded_store.remove(&old_bucket, &driver_id).await?;
        }
    }

    futures::future::try_join(
        data.sharded_store.upsert(&driver_id, &location, &rating),
        data.baseline_index.add(&driver_id, &location),
    )
    .await?;

    Ok(APISuccess::default())
}

/// First sighting of a driver: ask the profile collaborator for its rating,
/// falling back to the configured default. Synthetic load-test drivers
/// never touch profile storage.
async fn resolve_driver_rating(data: &Data<AppState>, driver_id: &DriverId) -> Rating {
    if driver_id.is_synthetic() {
        return data.search_cfg.fallback_driver_rating;
    }

    let Some(profile_service_url) = &data.profile_service_url else {
        return data.search_cfg.fallback_driver_rating;
    };

    match fetch_driver_rating(profile_service_url, driver_id).await {
        Ok(Some(rating)) => rating,
        Ok(None) => data.search_cfg.fallback_driver_rating,
        Err(err) => {
            warn!(
                tag = "[Driver Rating Fetch]",
                driver_id = %driver_id.0,
                "Falling back to default rating: {err}"
            );
            data.search_cfg.fallback_driver_rating
        }
    }
}
