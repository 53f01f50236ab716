/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("InternalError: {0}")]
    InternalError(String),
    #[error("InvalidRequest: {0}")]
    InvalidRequest(String),
    #[error("UnprocessibleRequest: {0}")]
    UnprocessibleRequest(String),
    #[error("LargePayloadSize: {0} > {1}")]
    LargePayloadSize(usize, usize),
    #[error("RequestTimeout")]
    RequestTimeout,
    #[error("ExternalAPICallError: {0}")]
    ExternalAPICallError(String),
    #[error("SerializationError: {0}")]
    SerializationError(String),
    #[error("DeserializationError: {0}")]
    DeserializationError(String),
    #[error("SearchUnavailable: {0}")]
    SearchUnavailable(String),
    #[error("Store round trip exceeded its deadline")]
    StoreTimeout,
    #[error("Failed to set key value in store")]
    SetFailed,
    #[error("Failed to set expiry for key in store")]
    SetExpiryFailed,
    #[error("Failed to get key value from store")]
    GetFailed,
    #[error("Failed to get batch of key values from store")]
    MGetFailed,
    #[error("Failed to delete key from store")]
    DeleteFailed,
    #[error("Failed to zadd to store")]
    ZAddFailed,
    #[error("Failed to zrem from store")]
    ZRemFailed,
    #[error("Failed to zrange from store")]
    ZRangeFailed,
    #[error("Failed to add geospatial items to store")]
    GeoAddFailed,
    #[error("Failed to geo search from store")]
    GeoSearchFailed,
}

impl AppError {
    fn code(&self) -> String {
        match self {
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::UnprocessibleRequest(_) => "UNPROCESSIBLE_REQUEST",
            AppError::LargePayloadSize(_, _) => "LARGE_PAYLOAD_SIZE",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::ExternalAPICallError(_) => "EXTERNAL_API_CALL_ERROR",
            AppError::SerializationError(_) => "SERIALIZATION_ERROR",
            AppError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            AppError::SearchUnavailable(_) => "SEARCH_UNAVAILABLE",
            AppError::StoreTimeout => "STORE_TIMEOUT",
            _ => "STORE_COMMAND_FAILED",
        }
        .to_string()
    }

    fn error_message(&self) -> ErrorBody {
        ErrorBody {
            message: self.to_string(),
            code: self.code(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::UnprocessibleRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::LargePayloadSize(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::SearchUnavailable(_) | AppError::StoreTimeout => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
