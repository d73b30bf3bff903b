use std::time::Duration;

use ntex::web;
use ntex::time;
use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use dcr_error::io::{IoError, IoResult};

use crate::models::{Pool, DBConn};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Create a connection pool to the postgres store at `url`
pub async fn create_pool(url: &str) -> IoResult<Pool> {
  let url = url.to_owned();
  web::block(move || {
    let manager = ConnectionManager::<PgConnection>::new(url);
    Pool::builder()
      .connection_timeout(Duration::from_secs(10))
      .build(manager)
  })
  .await
  .map_err(|err| {
    IoError::interrupted("Store", format!("unable to create pool {err}"))
  })
}

/// Get a connection from the pool
pub fn get_pool_conn(pool: &Pool) -> IoResult<DBConn> {
  let conn = match pool.get() {
    Ok(conn) => conn,
    Err(err) => {
      return Err(IoError::new(
        "Store connection",
        std::io::Error::new(std::io::ErrorKind::NotConnected, err),
      ))
    }
  };
  Ok(conn)
}

/// ## Init
///
/// Wait for the store to accept connections then run the pending migrations.
/// It returns the connection pool shared by the job repository.
///
pub async fn init(url: &str) -> IoResult<Pool> {
  log::info!("store: connecting");
  let pool = loop {
    match create_pool(url).await {
      Ok(pool) => break pool,
      Err(err) => {
        log::warn!("store: waiting for store: {err}");
        time::sleep(Duration::from_secs(2)).await;
      }
    }
  };
  log::info!("store: connected, running migrations");
  let migrated = pool.clone();
  web::block(move || {
    let mut conn = get_pool_conn(&migrated)?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|err| {
      IoError::interrupted("Store migration", format!("{err}"))
    })?;
    Ok::<_, IoError>(())
  })
  .await?;
  log::info!("store: migrations done");
  Ok(pool)
}
