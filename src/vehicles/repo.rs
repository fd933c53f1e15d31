use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{update_versioned, with_timeout, StoreError};
use crate::filters::{Filters, Metadata};
use crate::vehicles::repo_types::{NewVehicle, Vehicle, VehiclePageRow};

#[async_trait]
pub trait VehicleRepo: Send + Sync {
    async fn insert(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError>;
    async fn get(&self, id: i64) -> Result<Vehicle, StoreError>;
    async fn update(&self, vehicle: &mut Vehicle) -> Result<(), StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
    async fn list(&self, filters: &Filters) -> Result<(Vec<Vehicle>, Metadata), StoreError>;
}

#[derive(Clone)]
pub struct PgVehicleRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgVehicleRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl VehicleRepo for PgVehicleRepo {
    async fn insert(&self, v: NewVehicle) -> Result<Vehicle, StoreError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, Vehicle>(
                r#"
                INSERT INTO vehicles (license_plate, make, model, year, vin, color, body_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, license_plate, make, model, year, vin, color, body_type,
                          created_at, version
                "#,
            )
            .bind(&v.license_plate)
            .bind(&v.make)
            .bind(&v.model)
            .bind(v.year)
            .bind(&v.vin)
            .bind(&v.color)
            .bind(&v.body_type)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn get(&self, id: i64) -> Result<Vehicle, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, Vehicle>(
                r#"
                SELECT id, license_plate, make, model, year, vin, color, body_type,
                       created_at, version
                  FROM vehicles
                 WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn update(&self, vehicle: &mut Vehicle) -> Result<(), StoreError> {
        update_versioned(&self.db, self.timeout, vehicle).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        let res = with_timeout(
            self.timeout,
            sqlx::query("DELETE FROM vehicles WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, filters: &Filters) -> Result<(Vec<Vehicle>, Metadata), StoreError> {
        // sort_column() only ever returns a safelisted identifier.
        let sql = format!(
            r#"
            SELECT COUNT(*) OVER() AS total_records,
                   id, license_plate, make, model, year, vin, color, body_type,
                   created_at, version
              FROM vehicles
             ORDER BY {} {}, id ASC
             LIMIT $1 OFFSET $2
            "#,
            filters.sort_column(),
            filters.sort_direction()
        );

        let rows = with_timeout(
            self.timeout,
            sqlx::query_as::<_, VehiclePageRow>(&sql)
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch_all(&self.db),
        )
        .await?;

        let total = rows.first().map(|r| r.total_records).unwrap_or(0);
        let vehicles = rows.into_iter().map(|r| r.vehicle).collect();
        Ok((
            vehicles,
            Metadata::calculate(total, filters.page, filters.page_size),
        ))
    }
}
