// src/models/mod.rs

pub mod document;
pub mod page_visit;
pub mod quiz;
pub mod setting;
pub mod user;
pub mod zone;
