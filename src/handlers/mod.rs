//! HTTP 处理器模块

pub mod analysis;
pub mod auth;
pub mod health;
