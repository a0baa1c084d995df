pub mod bus;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod types;
