//! Process-local backend implementing every store trait.
//!
//! Used by `AppState::fake()` in tests. Updates go through [`VersionedTable`],
//! so conflict behaviour is the same as with Postgres.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{StoreError, Versioned};
use crate::filters::{Filters, Metadata};
use crate::tokens::repo_types::TokenRow;
use crate::tokens::{TokenRepo, TokenScope};
use crate::users::{NewUser, User, UserRepo};
use crate::vehicles::repo_types::{NewVehicle, Vehicle};
use crate::vehicles::VehicleRepo;

/// In-memory table with the same version check as [`super::update_versioned`].
pub struct VersionedTable<R> {
    rows: Mutex<BTreeMap<i64, R>>,
    next_id: AtomicI64,
}

impl<R: Versioned> Default for VersionedTable<R> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<R: Versioned> VersionedTable<R> {
    /// Inserts the row built from a fresh id unless `clashes` matches an existing row.
    pub async fn insert_unique<F, B>(
        &self,
        clashes: F,
        clash_error: StoreError,
        build: B,
    ) -> Result<R, StoreError>
    where
        F: Fn(&R) -> bool,
        B: FnOnce(i64) -> R,
    {
        let mut rows = self.rows.lock().await;
        if rows.values().any(clashes) {
            return Err(clash_error);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = build(id);
        rows.insert(id, row.clone());
        Ok(row)
    }

    pub async fn insert<B>(&self, build: B) -> R
    where
        B: FnOnce(i64) -> R,
    {
        let mut rows = self.rows.lock().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = build(id);
        rows.insert(id, row.clone());
        row
    }

    pub async fn get(&self, id: i64) -> Result<R, StoreError> {
        self.rows
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub async fn find<F>(&self, pred: F) -> Option<R>
    where
        F: Fn(&R) -> bool,
    {
        self.rows.lock().await.values().find(|r| pred(r)).cloned()
    }

    pub async fn all(&self) -> Vec<R> {
        self.rows.lock().await.values().cloned().collect()
    }

    pub async fn update(&self, record: &mut R) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&record.id()) {
            Some(current) if current.version() == record.version() => {
                let version = record.version() + 1;
                record.set_version(version);
                *current = record.clone();
                Ok(())
            }
            _ => Err(StoreError::EditConflict),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.rows
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    users: VersionedTable<User>,
    vehicles: VersionedTable<Vehicle>,
    tokens: Mutex<Vec<TokenRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored token row for `user_id`, expired ones included.
    pub async fn token_rows(&self, user_id: i64) -> Vec<TokenRow> {
        self.tokens
            .lock()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let email = user.email.clone();
        self.users
            .insert_unique(
                |existing| existing.email == email,
                StoreError::DuplicateEmail,
                |id| User {
                    id,
                    created_at: OffsetDateTime::now_utc(),
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    activated: false,
                    version: 1,
                },
            )
            .await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .find(|u| u.email == email)
            .await
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &mut User) -> Result<(), StoreError> {
        self.users.update(user).await
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn insert(&self, row: TokenRow) -> Result<(), StoreError> {
        self.tokens.lock().await.push(row);
        Ok(())
    }

    async fn user_for_token(
        &self,
        hash: &[u8],
        scope: TokenScope,
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        let user_id = self
            .tokens
            .lock()
            .await
            .iter()
            .find(|t| t.hash == hash && t.scope == scope && t.expiry > now)
            .map(|t| t.user_id)
            .ok_or(StoreError::NotFound)?;
        self.users.get(user_id).await
    }

    async fn delete_for_user(&self, user_id: i64, scope: TokenScope) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|t| !(t.user_id == user_id && t.scope == scope));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}

#[async_trait]
impl VehicleRepo for MemoryStore {
    async fn insert(&self, v: NewVehicle) -> Result<Vehicle, StoreError> {
        Ok(self
            .vehicles
            .insert(|id| Vehicle {
                id,
                license_plate: v.license_plate,
                make: v.make,
                model: v.model,
                year: v.year,
                vin: v.vin,
                color: v.color,
                body_type: v.body_type,
                created_at: OffsetDateTime::now_utc(),
                version: 1,
            })
            .await)
    }

    async fn get(&self, id: i64) -> Result<Vehicle, StoreError> {
        self.vehicles.get(id).await
    }

    async fn update(&self, vehicle: &mut Vehicle) -> Result<(), StoreError> {
        self.vehicles.update(vehicle).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.vehicles.delete(id).await
    }

    async fn list(&self, filters: &Filters) -> Result<(Vec<Vehicle>, Metadata), StoreError> {
        let mut all = self.vehicles.all().await;
        let column = filters.sort_column();
        all.sort_by(|a, b| {
            let primary = a.cmp_by(b, column);
            let primary = if filters.descending() {
                primary.reverse()
            } else {
                primary
            };
            primary.then(a.id.cmp(&b.id))
        });

        let total = all.len() as i64;
        let page: Vec<Vehicle> = all
            .into_iter()
            .skip(filters.offset().max(0) as usize)
            .take(filters.limit().max(0) as usize)
            .collect();
        let total = if page.is_empty() { 0 } else { total };
        Ok((
            page,
            Metadata::calculate(total, filters.page, filters.page_size),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicles::repo_types::SORT_SAFELIST;

    fn new_vehicle(plate: &str, year: i32) -> NewVehicle {
        NewVehicle {
            license_plate: plate.into(),
            make: "Honda".into(),
            model: "Civic".into(),
            year,
            vin: format!("VIN-{plate}"),
            color: "blue".into(),
            body_type: "hatchback".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            name: "Alice".into(),
            email: "alice@x.com".into(),
            password_hash: "hash".into(),
        };
        let first = UserRepo::insert(&store, user.clone()).await.unwrap();
        assert_eq!((first.id, first.version, first.activated), (1, 1, false));
        let err = UserRepo::insert(&store, user).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn list_sorts_and_pages() {
        let store = MemoryStore::new();
        for (plate, year) in [("A", 2010), ("B", 2020), ("C", 2015), ("D", 2020)] {
            VehicleRepo::insert(&store, new_vehicle(plate, year)).await.unwrap();
        }

        let filters = Filters {
            page: 1,
            page_size: 3,
            sort: "-year".into(),
            sort_safelist: SORT_SAFELIST,
        };
        let (page, meta) = store.list(&filters).await.unwrap();
        let plates: Vec<_> = page.iter().map(|v| v.license_plate.as_str()).collect();
        assert_eq!(plates, ["B", "D", "C"]);
        assert_eq!(meta.total_records, 4);
        assert_eq!(meta.last_page, 2);

        let filters = Filters { page: 2, ..filters };
        let (page, meta) = store.list(&filters).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].license_plate, "A");
        assert_eq!(meta.current_page, 2);
    }

    #[tokio::test]
    async fn delete_missing_vehicle_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            VehicleRepo::delete(&store, 99).await,
            Err(StoreError::NotFound)
        ));
    }
}
