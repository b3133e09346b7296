//! 数据模型模块
//! 请求与响应 DTO

pub mod analysis;
pub mod auth;
