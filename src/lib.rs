pub mod auth;
pub mod capaian;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod services;
pub mod types;

pub use routes::app;
