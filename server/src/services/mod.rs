pub mod auth_service;
pub mod money;
pub mod rating;
