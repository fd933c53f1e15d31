//! Optimistic concurrency for version-stamped rows.
//!
//! Every mutable resource carries a `version` column. An update is only
//! applied when the stored version still equals the version the caller
//! read; the statement bumps the version by one and returns it. When no row
//! matches, somebody else committed first and the caller gets
//! [`StoreError::EditConflict`].

use std::time::Duration;

use sqlx::{Encode, PgPool, Postgres, QueryBuilder, Type};
use tracing::{debug, warn};

use super::{with_timeout, StoreError};

/// A row that is updated through the version check.
pub trait Versioned: Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> i64;
    fn version(&self) -> i32;
    fn set_version(&mut self, version: i32);

    /// Pushes every mutable column (everything but `id` and `version`).
    fn assign(&self, update: &mut VersionedUpdate);
}

/// Builds `UPDATE <table> SET .., version = version + 1`
/// `WHERE id = $n AND version = $m RETURNING version`.
pub struct VersionedUpdate {
    builder: QueryBuilder<'static, Postgres>,
    columns: usize,
}

impl VersionedUpdate {
    fn new(table: &str) -> Self {
        let mut builder = QueryBuilder::new("UPDATE ");
        builder.push(table).push(" SET ");
        Self { builder, columns: 0 }
    }

    pub fn set<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: 'static + Encode<'static, Postgres> + Type<Postgres> + Send,
    {
        if self.columns > 0 {
            self.builder.push(", ");
        }
        self.builder.push(column).push(" = ").push_bind(value);
        self.columns += 1;
        self
    }

    fn finish(mut self, id: i64, version: i32) -> QueryBuilder<'static, Postgres> {
        if self.columns > 0 {
            self.builder.push(", ");
        }
        self.builder
            .push("version = version + 1 WHERE id = ")
            .push_bind(id)
            .push(" AND version = ")
            .push_bind(version)
            .push(" RETURNING version");
        self.builder
    }

    /// The complete statement for `record`, binds appended in argument order.
    pub fn statement<R: Versioned>(record: &R) -> QueryBuilder<'static, Postgres> {
        let mut update = VersionedUpdate::new(R::TABLE);
        record.assign(&mut update);
        update.finish(record.id(), record.version())
    }
}

/// Commits `record` if its version is still current and stores the new version on it.
pub async fn update_versioned<R: Versioned>(
    db: &PgPool,
    limit: Duration,
    record: &mut R,
) -> Result<(), StoreError> {
    let mut query = VersionedUpdate::statement(record);
    let row = with_timeout(
        limit,
        query.build_query_as::<(i32,)>().fetch_optional(db),
    )
    .await?;

    match row {
        Some((version,)) => {
            debug!(table = R::TABLE, id = record.id(), version, "versioned update committed");
            record.set_version(version);
            Ok(())
        }
        None => {
            warn!(table = R::TABLE, id = record.id(), version = record.version(), "edit conflict");
            Err(StoreError::EditConflict)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::VersionedTable;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: i64,
        body: String,
        pinned: bool,
        version: i32,
    }

    impl Versioned for Note {
        const TABLE: &'static str = "notes";

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
                .set("body", self.body.clone())
                .set("pinned", self.pinned);
        }
    }

    fn note(id: i64) -> Note {
        Note {
            id,
            body: "first".into(),
            pinned: false,
            version: 1,
        }
    }

    #[test]
    fn statement_binds_set_columns_then_id_then_version() {
        let query = VersionedUpdate::statement(&note(7));
        assert_eq!(
            query.sql(),
            "UPDATE notes SET body = $1, pinned = $2, version = version + 1 \
             WHERE id = $3 AND version = $4 RETURNING version"
        );
    }

    #[tokio::test]
    async fn update_bumps_version_by_one() {
        let table = VersionedTable::<Note>::default();
        let mut row = table.insert(note).await;
        row.body = "second".into();
        table.update(&mut row).await.expect("update");
        assert_eq!(row.version, 2);
        assert_eq!(table.get(row.id).await.unwrap(), row);
    }

    #[tokio::test]
    async fn stale_version_is_an_edit_conflict() {
        let table = VersionedTable::<Note>::default();
        let original = table.insert(note).await;

        let mut first = original.clone();
        first.pinned = true;
        table.update(&mut first).await.expect("first writer wins");

        let mut second = original.clone();
        second.body = "late".into();
        let err = table.update(&mut second).await.unwrap_err();
        assert!(matches!(err, StoreError::EditConflict));

        let stored = table.get(original.id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert!(stored.pinned);
        assert_eq!(stored.body, "first");
    }

    #[tokio::test]
    async fn concurrent_writers_exactly_one_commits() {
        let table = Arc::new(VersionedTable::<Note>::default());
        let original = table.insert(note).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let table = table.clone();
            let mut row = original.clone();
            handles.push(tokio::spawn(async move {
                row.body = format!("writer {i}");
                table.update(&mut row).await
            }));
        }

        let mut committed = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => committed += 1,
                Err(StoreError::EditConflict) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(committed, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(table.get(original.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn missing_row_is_a_conflict_at_update_time() {
        let table = VersionedTable::<Note>::default();
        let mut ghost = note(42);
        assert!(matches!(
            table.update(&mut ghost).await,
            Err(StoreError::EditConflict)
        ));
    }
}
