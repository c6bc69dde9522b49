//! `SQLite` implementation of [`FarmDirectory`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use farmhub_app::ports::FarmDirectory;
use farmhub_domain::error::FarmHubError;
use farmhub_domain::farm::{Device, Farm};
use farmhub_domain::id::{DeviceId, FarmId, UserId};

use crate::error::StorageError;

struct FarmRow(Farm);

impl<'r> FromRow<'r, SqliteRow> for FarmRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Farm {
            id: FarmId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            owner_id: UserId::new(row.try_get("user_id")?),
        }))
    }
}

struct DeviceRow(Device);

impl<'r> FromRow<'r, SqliteRow> for DeviceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Device {
            id: DeviceId::new(row.try_get("id")?),
            farm_id: FarmId::new(row.try_get("farm_id")?),
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            identifier: row.try_get("identifier")?,
        }))
    }
}

const SELECT_FARM: &str = "SELECT id, name, user_id FROM farms WHERE id = ?";

const SELECT_DEVICES_BY_FARM: &str = r"
    SELECT id, farm_id, name, kind, identifier FROM devices
    WHERE farm_id = ?
    ORDER BY id ASC
";

/// `SQLite`-backed farm and device lookups.
pub struct SqliteFarmDirectory {
    pool: SqlitePool,
}

impl SqliteFarmDirectory {
    /// Create a new directory using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FarmDirectory for SqliteFarmDirectory {
    async fn get_farm(&self, id: FarmId) -> Result<Option<Farm>, FarmHubError> {
        let row: Option<FarmRow> = sqlx::query_as(SELECT_FARM)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn devices_for_farm(&self, farm_id: FarmId) -> Result<Vec<Device>, FarmHubError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(SELECT_DEVICES_BY_FARM)
            .bind(farm_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
