use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use std::time::Duration;

use crate::models::{month, org, project, pull_request, user};

/// Open the connection pool and make sure every table exists
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(100)
        .min_connections(10)
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    create_schema(&db).await?;

    Ok(db)
}

/// Create the tracker tables if they are missing, parents before children
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, month::Entity).await?;
    create_table(db, org::Entity).await?;
    create_table(db, project::Entity).await?;
    create_table(db, pull_request::Entity).await?;

    log::info!("Database schema is up to date");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    Ok(())
}
