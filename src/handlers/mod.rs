// src/handlers/mod.rs

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod document;
pub mod draft;
pub mod quiz;
pub mod settings;
pub mod zone;
