/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::call_external_api;
use crate::tools::error::AppError;
use crate::utils::prometheus::CALL_EXTERNAL_API;
use reqwest::{header::HeaderMap, Client, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;

pub async fn call_api<T, B>(
    method: Method,
    url: &Url,
    headers: HeaderMap,
    body: Option<&B>,
) -> Result<T, AppError>
where
    T: DeserializeOwned,
    B: Serialize,
{
    let start = Instant::now();
    let host = url.host_str().unwrap_or("UNKNOWN").to_string();
    let method_label = method.to_string();

    let client = Client::new();
    let mut request_builder = client.request(method, url.clone()).headers(headers);

    if let Some(body) = body {
        request_builder = request_builder.json(body);
    }

    let response = request_builder.send().await.map_err(|err| {
        call_external_api!(method_label.as_str(), host.as_str(), "ERROR", start);
        AppError::ExternalAPICallError(err.to_string())
    })?;

    let status = response.status();
    call_external_api!(method_label.as_str(), host.as_str(), status.as_str(), start);

    if !status.is_success() {
        return Err(AppError::ExternalAPICallError(format!(
            "{host} responded with {status}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| AppError::DeserializationError(err.to_string()))
}
