pub mod category;
pub mod config;
pub mod cost;
pub mod error;
pub mod graphs;
pub mod predictions;
pub mod route_service;
pub mod search;
pub mod snapshot;
pub mod utility;
