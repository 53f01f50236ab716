/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use reqwest::{header::HeaderMap, Method, Url};
use serde::Deserialize;
use shared::tools::error::AppError;
use shared::utils::callapi::call_api;

/// The slice of the profile service's driver payload this engine cares
/// about; everything else is ignored on deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverProfileResponse {
    pub rating: Option<f64>,
}

/// Read path to the profile/status collaborator: fetch a driver's quality
/// rating by id. Used only when a driver shows up with no cached metadata.
pub async fn fetch_driver_rating(
    profile_service_url: &Url,
    DriverId(driver_id): &DriverId,
) -> Result<Option<Rating>, AppError> {
    let url = profile_service_url
        .join(&format!("internal/drivers/{driver_id}"))
        .map_err(|err| AppError::ExternalAPICallError(err.to_string()))?;

    let response: DriverProfileResponse =
        call_api(Method::GET, &url, HeaderMap::new(), None::<&()>).await?;

    Ok(response.rating.map(Rating))
}
