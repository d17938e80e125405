//! HTTP request handlers for the imagery API.

pub mod common;
pub mod health;
pub mod images;
