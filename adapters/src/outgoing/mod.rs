pub mod compression;
pub mod postgres_sqlx;
pub mod registry_tokio;
