use actix_web::{
    get,
    web::{Data, Json},
};
use serde::{Deserialize, Serialize};

use crate::{
    environment::AppState,
    storage::{keys::health_check_key, LocationKv},
};

use shared::tools::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseData {
    pub result: String,
}

#[get("/healthcheck")]
async fn health_check(data: Data<AppState>) -> Result<Json<ResponseData>, AppError> {
    data.kv
        .set_with_expiry(
            &health_check_key(),
            "driver-locator-health-check".to_string(),
            data.location_expiry_seconds,
        )
        .await?;

    let health_check_resp = data.kv.get(&health_check_key()).await?;

    if health_check_resp.is_none() {
        return Err(AppError::InternalError(
            "Health check failed as cannot get key from store".to_string(),
        ));
    }

    Ok(Json(ResponseData {
        result: "Service Is Up".to_string(),
    }))
}
