use crate::entities::{favourites, files, orphaned_blobs};
use anyhow::Context;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    let stmts = vec![
        (
            "files",
            schema
                .create_table_from_entity(files::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "favourites",
            schema
                .create_table_from_entity(favourites::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "orphaned_blobs",
            schema
                .create_table_from_entity(orphaned_blobs::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        db.execute(stmt)
            .await
            .with_context(|| format!("Failed to create table '{}'", name))?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_files_scope_deleted ON files(scope_id, deleted)",
        "CREATE INDEX IF NOT EXISTS idx_files_scope_type ON files(scope_id, file_type)",
        "CREATE INDEX IF NOT EXISTS idx_files_created_at ON files(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_files_deleted_at ON files(deleted_at)",
        "CREATE INDEX IF NOT EXISTS idx_favourites_principal ON favourites(scope_id, principal_id)",
        "CREATE INDEX IF NOT EXISTS idx_favourites_file_id ON favourites(file_id)",
        "CREATE INDEX IF NOT EXISTS idx_orphaned_blobs_created_at ON orphaned_blobs(created_at)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => tracing::debug!("   - Executed schema update: {}", query),
            Err(e) => tracing::warn!("   - Schema update warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
