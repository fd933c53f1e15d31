use serde::{Deserialize, Serialize};

use crate::filters::Metadata;
use crate::vehicles::repo_types::Vehicle;

/// PATCH body. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct VehiclePatch {
    pub license_plate: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub color: Option<String>,
    pub body_type: Option<String>,
}

impl VehiclePatch {
    pub fn apply(self, vehicle: &mut Vehicle) {
        if let Some(v) = self.license_plate {
            vehicle.license_plate = v;
        }
        if let Some(v) = self.make {
            vehicle.make = v;
        }
        if let Some(v) = self.model {
            vehicle.model = v;
        }
        if let Some(v) = self.year {
            vehicle.year = v;
        }
        if let Some(v) = self.vin {
            vehicle.vin = v;
        }
        if let Some(v) = self.color {
            vehicle.color = v;
        }
        if let Some(v) = self.body_type {
            vehicle.body_type = v;
        }
    }
}

/// Raw list query. Values stay strings so bad integers become field errors
/// instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VehicleEnvelope {
    pub vehicle: Vehicle,
}

#[derive(Debug, Serialize)]
pub struct VehicleList {
    pub vehicles: Vec<Vehicle>,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
