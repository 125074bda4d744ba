pub mod analytics;
pub mod db;
pub mod error;
pub mod import;
pub mod metrics;
pub mod models;
pub mod progress;
