// hearth-server/src/lib.rs

//! Storefront and digital-home backend: accounts, catalog, carts, orders,
//! reviews and 3D homes behind an actix-web JSON API. Multi-step writes run
//! as `hearth_flow` pipelines.

pub mod assets;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod web;
