use actix_web::{
    get,
    web::{Data, Json},
};

use crate::{
    domain::{action::internal::location, types::internal::location::*},
    environment::AppState,
};

use shared::tools::error::AppError;

#[get("/internal/drivers/nearby")]
pub async fn get_nearby_drivers(
    data: Data<AppState>,
    param_obj: Json<NearbyDriversRequest>,
) -> Result<Json<NearbyDriverResponse>, AppError> {
    let request_body = param_obj.into_inner();

    Ok(Json(
        location::get_nearby_drivers(data, request_body).await?,
    ))
}
