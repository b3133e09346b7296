//! AI Playground API
//! 登录认证与基于生成式模型的音频、图片、文档分析

pub mod auth;
pub mod config;
pub mod error;
pub mod genai;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;
