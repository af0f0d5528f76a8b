pub mod bot;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod rest;

pub use error::{GatewayError, HandlerError, RestError};
pub use gateway::GatewayConnection;
pub use rest::RestClient;
