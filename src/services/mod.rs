// src/services/mod.rs
pub mod account_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod document_service;
pub mod import_service;
pub mod letter;
pub mod request_service;
pub mod roster_service;
