// src/models/mod.rs
pub mod account;
pub mod document;
pub mod lor_request;
pub mod roster;
