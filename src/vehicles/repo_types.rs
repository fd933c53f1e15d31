use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::db::{Versioned, VersionedUpdate};

pub const SORT_SAFELIST: &[&str] = &[
    "id",
    "year",
    "color",
    "body_type",
    "created_at",
    "-id",
    "-year",
    "-color",
    "-body_type",
    "-created_at",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub color: String,
    pub body_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub version: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub color: String,
    pub body_type: String,
}

/// Row returned by the list query: the window count rides along with every vehicle.
#[derive(Debug, FromRow)]
pub struct VehiclePageRow {
    pub total_records: i64,
    #[sqlx(flatten)]
    pub vehicle: Vehicle,
}

impl Vehicle {
    /// Ordering on one of the safelisted columns (without the `-` prefix).
    pub fn cmp_by(&self, other: &Vehicle, column: &str) -> Ordering {
        match column {
            "year" => self.year.cmp(&other.year),
            "color" => self.color.cmp(&other.color),
            "body_type" => self.body_type.cmp(&other.body_type),
            "created_at" => self.created_at.cmp(&other.created_at),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Versioned for Vehicle {
    const TABLE: &'static str = "vehicles";

    fn id(&self) -> i64 {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn assign(&self, update: &mut VersionedUpdate) {
        update
            .set("license_plate", self.license_plate.clone())
            .set("make", self.make.clone())
            .set("model", self.model.clone())
            .set("year", self.year)
            .set("vin", self.vin.clone())
            .set("color", self.color.clone())
            .set("body_type", self.body_type.clone());
    }
}
