use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm::sea_query::Index;
use tracing::{info, warn};

use crate::entity::asset;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    sync_schema(&db).await?;

    Ok(db)
}

/// Create or update every registered entity table.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.get_schema_registry("server::entity::*")
        .sync(db)
        .await?;
    ensure_indexes(db).await;
    Ok(())
}

/// Ensure secondary indexes exist.
///
/// Schema-sync only creates the unique index on `canonical_name`; the kind
/// index backs kind-filtered similarity search.
async fn ensure_indexes(db: &DatabaseConnection) {
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_asset_kind")
        .table(asset::Entity)
        .col(asset::Column::Kind)
        .to_owned();

    let backend = db.get_database_backend();
    match db.execute_raw(backend.build(&stmt)).await {
        Ok(_) => info!("Ensured index idx_asset_kind exists"),
        Err(e) => warn!("Failed to create index idx_asset_kind: {}", e),
    }
}
