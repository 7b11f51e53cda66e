use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await
        .expect("Failed to connect to database")
}
