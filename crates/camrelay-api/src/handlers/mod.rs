//! HTTP request handlers for the relay API

pub mod assistant;
pub mod clients;
pub mod forward;
pub mod health;
