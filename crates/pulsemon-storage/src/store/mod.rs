use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::error::Result;

pub mod alert;
pub mod metric;
pub mod rule;

/// 监控数据库的统一访问层。
///
/// All methods are `async fn` over SeaORM; Postgres in production, SQLite
/// in tests. The schema migration runs on connect.
pub struct MonitorStore {
    db: DatabaseConnection,
}

impl MonitorStore {
    /// Connects to `url` and brings the schema up to date.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        Migrator::up(&db, None).await?;
        tracing::info!("Monitor store initialized");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
