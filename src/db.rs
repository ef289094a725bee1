use sea_orm::{
    ConnectionTrait, ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement,
};
use sea_orm::sea_query::TableCreateStatement;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{departamento, funcao, funcionario, unidade, usuario};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!("Connecting to database: {}", config.display_target());

    let mut opt = ConnectOptions::new(config.connection_url());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);
    if let Some(secs) = config.max_lifetime_secs {
        opt.max_lifetime(Duration::from_secs(secs));
    }

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    // Auto-migrate tables
    auto_migrate(&db).await?;

    Ok(db)
}

/// Auto-migrate database tables
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    // 1. Independent tables first
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(usuario::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(departamento::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(funcao::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(unidade::Entity)).await?;

    // 2. Tables with foreign key dependencies
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(funcionario::Entity)).await?;

    // 3. Columns that predate the current entity definitions
    if backend == DbBackend::Postgres {
        add_missing_columns(db, backend).await?;
    }

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Add missing columns to existing tables
async fn add_missing_columns(db: &DatabaseConnection, backend: DbBackend) -> Result<(), DbErr> {
    // Early deployments had no Teams handle or edit flag
    add_column_if_not_exists(db, backend, "funcionarios", "teams", "VARCHAR(200) NULL").await?;
    add_column_if_not_exists(db, backend, "usuarios", "can_edit", "BOOLEAN NOT NULL DEFAULT TRUE").await?;

    Ok(())
}

/// Add a column to a table if it doesn't exist (PostgreSQL only)
async fn add_column_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    table: &str,
    column: &str,
    column_def: &str,
) -> Result<(), DbErr> {
    let check = Statement::from_sql_and_values(
        backend,
        "SELECT column_name FROM information_schema.columns WHERE table_name = $1 AND column_name = $2",
        [table.into(), column.into()],
    );

    if db.query_one(check).await?.is_none() {
        let alter_sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def);
        info!("Adding column {}.{}", table, column);
        db.execute(Statement::from_string(backend, alter_sql)).await?;
    }

    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
