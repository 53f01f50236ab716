/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use serde::{Deserialize, Serialize};
use shared::tools::error::AppError;

pub fn validate_latitude(Latitude(lat): &Latitude) -> Result<(), AppError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(lat) {
        return Err(AppError::InvalidRequest(format!(
            "latitude must be a finite value in [-90, 90], got {lat}"
        )));
    }
    Ok(())
}

pub fn validate_longitude(Longitude(lon): &Longitude) -> Result<(), AppError> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(lon) {
        return Err(AppError::InvalidRequest(format!(
            "longitude must be a finite value in [-180, 180], got {lon}"
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub driver_id: DriverId,
    pub latitude: Latitude,
    pub longitude: Longitude,
}

impl UpdateLocationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.driver_id.0.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "driverId must not be empty".to_string(),
            ));
        }
        validate_latitude(&self.latitude)?;
        validate_longitude(&self.longitude)
    }
}
