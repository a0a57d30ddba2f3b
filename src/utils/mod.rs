pub mod config;
pub mod db;
pub mod http_client;
pub mod period;
pub mod validators;
