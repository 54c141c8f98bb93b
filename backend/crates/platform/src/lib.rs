//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Layered configuration loading (defaults, `.env` file, environment)
//! - Password hashing (Argon2id)
//! - Cookie management
//! - CORS origin matching

pub mod config;
pub mod cookie;
pub mod cors;
pub mod password;
