/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::types::ui::location::{validate_latitude, validate_longitude};
use serde::{Deserialize, Serialize};
use shared::tools::error::AppError;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriversRequest {
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub radius_km: Radius,
    /// Optional; a missing or non-positive count falls back to the
    /// configured default.
    pub count: Option<u32>,
    /// Optional; defaults to the configured active mode.
    pub mode: Option<SearchMode>,
}

impl NearbyDriversRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_latitude(&self.latitude)?;
        validate_longitude(&self.longitude)?;

        let Radius(radius_km) = self.radius_km;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::InvalidRequest(format!(
                "radiusKm must be a finite value > 0, got {radius_km}"
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    pub driver_id: DriverId,
    pub distance_km: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NearbyDriverResponse {
    pub drivers: Vec<NearbyDriver>,
}
