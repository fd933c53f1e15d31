use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::ActivatedUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::validator::FieldErrors;
use crate::vehicles::dto::{ListQuery, MessageResponse, VehicleEnvelope, VehicleList, VehiclePatch};
use crate::vehicles::repo_types::NewVehicle;
use crate::vehicles::services::VehicleService;

pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:id", get(show_vehicle))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", post(create_vehicle))
        .route(
            "/vehicles/:id",
            axum::routing::patch(update_vehicle).delete(delete_vehicle),
        )
}

/// Non-numeric and non-positive ids are simply not found.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

fn expected_version(headers: &HeaderMap) -> Result<i32, AppError> {
    let parsed = headers
        .get(EXPECTED_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok());
    parsed.ok_or_else(|| {
        AppError::ValidationFailed(FieldErrors::from([(
            EXPECTED_VERSION_HEADER.to_string(),
            "must be provided as an integer".to_string(),
        )]))
    })
}

#[instrument(skip(vehicles))]
pub async fn list_vehicles(
    State(vehicles): State<VehicleService>,
    Query(query): Query<ListQuery>,
) -> Result<Json<VehicleList>, AppError> {
    let (vehicles, metadata) = vehicles.list(&query).await?;
    Ok(Json(VehicleList { vehicles, metadata }))
}

#[instrument(skip(vehicles))]
pub async fn show_vehicle(
    State(vehicles): State<VehicleService>,
    Path(id): Path<String>,
) -> Result<Json<VehicleEnvelope>, AppError> {
    let vehicle = vehicles.get(parse_id(&id)?).await?;
    Ok(Json(VehicleEnvelope { vehicle }))
}

#[instrument(skip(vehicles, user, body), fields(user_id = user.0.id))]
pub async fn create_vehicle(
    State(vehicles): State<VehicleService>,
    user: ActivatedUser,
    Json(body): Json<NewVehicle>,
) -> Result<impl IntoResponse, AppError> {
    let vehicle = vehicles.create(body).await?;
    let location = format!("/v1/vehicles/{}", vehicle.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(VehicleEnvelope { vehicle }),
    ))
}

#[instrument(skip(vehicles, user, headers, patch), fields(user_id = user.0.id))]
pub async fn update_vehicle(
    State(vehicles): State<VehicleService>,
    user: ActivatedUser,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<VehiclePatch>,
) -> Result<Json<VehicleEnvelope>, AppError> {
    let id = parse_id(&id)?;
    let expected = expected_version(&headers)?;
    let vehicle = vehicles.update(id, expected, patch).await?;
    Ok(Json(VehicleEnvelope { vehicle }))
}

#[instrument(skip(vehicles, user), fields(user_id = user.0.id))]
pub async fn delete_vehicle(
    State(vehicles): State<VehicleService>,
    user: ActivatedUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    vehicles.delete(parse_id(&id)?).await?;
    Ok(Json(MessageResponse {
        message: "vehicle successfully deleted".into(),
    }))
}
