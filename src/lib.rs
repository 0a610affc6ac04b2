//! Library exports for the blog application
//!
//! This module exposes internal components for testing and for the binary.

pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod identity;
pub mod middleware;
pub mod model;
pub mod route;
pub mod validation;
