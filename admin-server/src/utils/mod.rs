//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] / [`AppResponse`] - 应用错误类型和响应结构
//! - [`logger`] - tracing 初始化
//! - [`time`] - UTC 日期窗口换算

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
