// src/utils/mod.rs

pub mod analytics;
pub mod boundary;
pub mod cache;
pub mod draft;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod storage;
pub mod user_agent;
