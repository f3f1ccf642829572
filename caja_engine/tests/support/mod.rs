use std::path::Path;

use caja_engine::SqliteDatabase;
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

/// Creates a fresh throwaway database, runs the migrations and returns a handle to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    let _ = env_logger::try_init();
    create_database(url).await;
    run_migrations(url).await
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_caja_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) -> SqliteDatabase {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀 Migrations complete");
    db
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

pub mod seed {
    use caja_engine::{db_types::Product, sqlite::db::products, SqliteDatabase};

    pub async fn product(db: &SqliteDatabase, id: &str, name: &str, stock: i64) {
        let mut conn = db.pool().acquire().await.expect("Could not acquire connection");
        let product = Product { id: id.to_string(), name: name.to_string(), stock, last_sold: None };
        products::upsert_product(&product, &mut conn).await.expect("Error seeding product");
    }

    pub async fn stock_of(db: &SqliteDatabase, id: &str) -> i64 {
        let mut conn = db.pool().acquire().await.expect("Could not acquire connection");
        products::fetch_product(id, &mut conn)
            .await
            .expect("Error fetching product")
            .unwrap_or_else(|| panic!("Product {id} not seeded"))
            .stock
    }
}
