/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::{keys::baseline_geo_key, LocationKv};
use crate::common::types::*;
use shared::tools::error::AppError;
use std::sync::Arc;

/// The unoptimized comparison path: every driver in one flat geo index.
/// Query latency grows with total entity density inside the radius, which
/// is exactly what the sharded path is measured against.
pub struct BaselineRadiusIndex {
    kv: Arc<dyn LocationKv>,
}

impl BaselineRadiusIndex {
    pub fn new(kv: Arc<dyn LocationKv>) -> Self {
        Self { kv }
    }

    pub async fn add(&self, driver_id: &DriverId, location: &Point) -> Result<(), AppError> {
        let Latitude(lat) = location.lat;
        let Longitude(lon) = location.lon;
        self.kv
            .geo_add(&baseline_geo_key(), lon, lat, &driver_id.0)
            .await
    }

    /// All drivers within `radius` of the origin, ascending by distance,
    /// capped at `max_count` when given. Invalid coordinates or radius are
    /// rejected before any store round trip; a missing or non-positive cap
    /// is omitted and the index default applies.
    pub async fn search_within_radius(
        &self,
        origin: &Point,
        radius: &Radius,
        max_count: Option<u64>,
    ) -> Result<Vec<(DriverId, f64)>, AppError> {
        let Latitude(lat) = origin.lat;
        let Longitude(lon) = origin.lon;
        let Radius(radius_km) = *radius;

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::InvalidRequest(format!(
                "Valid latitude is required for geo search, got {lat}"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::InvalidRequest(format!(
                "Valid longitude is required for geo search, got {lon}"
            )));
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "Valid radius is required for geo search, got {radius_km}"
            )));
        }

        let hits = self
            .kv
            .geo_search(
                &baseline_geo_key(),
                lon,
                lat,
                radius_km,
                max_count.filter(|count| *count > 0),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|(member, distance)| (DriverId(member), distance))
            .collect())
    }
}
