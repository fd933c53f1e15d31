use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::filters::{Filters, Metadata};
use crate::state::AppState;
use crate::validator::{not_blank, Validator};
use crate::vehicles::dto::{ListQuery, VehiclePatch};
use crate::vehicles::repo::VehicleRepo;
use crate::vehicles::repo_types::{NewVehicle, Vehicle, SORT_SAFELIST};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const FIRST_MODEL_YEAR: i32 = 1886;

#[derive(Clone)]
pub struct VehicleService {
    repo: Arc<dyn VehicleRepo>,
}

impl FromRef<AppState> for VehicleService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.vehicles.clone())
    }
}

pub fn validate_vehicle(v: &mut Validator, vehicle: &NewVehicle) {
    for (field, value) in [
        ("license_plate", &vehicle.license_plate),
        ("make", &vehicle.make),
        ("model", &vehicle.model),
        ("vin", &vehicle.vin),
        ("color", &vehicle.color),
        ("body_type", &vehicle.body_type),
    ] {
        v.check(not_blank(value), field, "must be provided");
    }
    v.check(
        vehicle.year >= FIRST_MODEL_YEAR,
        "year",
        "must be greater than or equal to 1886",
    );
    v.check(
        vehicle.year <= OffsetDateTime::now_utc().year(),
        "year",
        "must not be in the future",
    );
}

fn read_int(v: &mut Validator, raw: Option<&str>, field: &str, default: i64) -> i64 {
    match raw {
        None => default,
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            v.add_error(field, "must be an integer value");
            default
        }),
    }
}

impl From<&Vehicle> for NewVehicle {
    fn from(v: &Vehicle) -> Self {
        NewVehicle {
            license_plate: v.license_plate.clone(),
            make: v.make.clone(),
            model: v.model.clone(),
            year: v.year,
            vin: v.vin.clone(),
            color: v.color.clone(),
            body_type: v.body_type.clone(),
        }
    }
}

impl VehicleService {
    pub fn new(repo: Arc<dyn VehicleRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, vehicle))]
    pub async fn create(&self, vehicle: NewVehicle) -> Result<Vehicle, AppError> {
        let mut v = Validator::new();
        validate_vehicle(&mut v, &vehicle);
        v.finish()?;

        let created = self.repo.insert(vehicle).await?;
        info!(vehicle_id = created.id, "vehicle created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Vehicle, AppError> {
        Ok(self.repo.get(id).await?)
    }

    /// Applies `patch` on top of the stored row, provided the caller last saw
    /// `expected_version`. A stale version, whether noticed here or at commit,
    /// is an `EditConflict`.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: i64,
        expected_version: i32,
        patch: VehiclePatch,
    ) -> Result<Vehicle, AppError> {
        let mut vehicle = self.repo.get(id).await?;
        if vehicle.version != expected_version {
            warn!(
                vehicle_id = id,
                stored = vehicle.version,
                expected_version,
                "stale vehicle version"
            );
            return Err(AppError::EditConflict);
        }

        patch.apply(&mut vehicle);
        let mut v = Validator::new();
        validate_vehicle(&mut v, &NewVehicle::from(&vehicle));
        v.finish()?;

        self.repo.update(&mut vehicle).await?;
        info!(vehicle_id = id, version = vehicle.version, "vehicle updated");
        Ok(vehicle)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.repo.delete(id).await?;
        info!(vehicle_id = id, "vehicle deleted");
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Vehicle>, Metadata), AppError> {
        let mut v = Validator::new();
        let filters = Filters {
            page: read_int(&mut v, query.page.as_deref(), "page", 1),
            page_size: read_int(&mut v, query.page_size.as_deref(), "page_size", DEFAULT_PAGE_SIZE),
            sort: query.sort.clone().unwrap_or_else(|| "id".into()),
            sort_safelist: SORT_SAFELIST,
        };
        filters.validate(&mut v);
        v.finish()?;

        Ok(self.repo.list(&filters).await?)
    }
}
