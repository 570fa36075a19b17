//! HTTP request handlers

pub mod gateway;
pub mod health;
pub mod inbox;
