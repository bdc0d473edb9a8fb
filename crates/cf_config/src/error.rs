// crates/cf_config/src/error.rs

//! 配置错误类型
//!
//! 所有配置错误在启动阶段即被发现并终止程序。错误信息点名非法值
//! 并列出可接受的取值集合，方便用户修改参数文件。

use thiserror::Error;

/// 配置层错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未知的状态方程名
    #[error("未知的状态方程 \"{name}\"，可选值: {accepted}")]
    UnknownEquationOfState {
        /// 用户给定的名称
        name: String,
        /// 可接受的名称集合
        accepted: &'static str,
    },

    /// 未知的方程名
    #[error("未知的方程 \"{name}\"，可选值: {accepted}")]
    UnknownEquation {
        name: String,
        accepted: &'static str,
    },

    /// 未知的指示器名
    #[error("未知的指示器 \"{name}\"，可选值: {accepted}")]
    UnknownIndicator {
        name: String,
        accepted: &'static str,
    },

    /// 维度超出范围
    #[error("维度 {dimension} 超出范围，可选值: 1, 2, 3")]
    DimensionOutOfRange {
        /// 用户给定的维度
        dimension: usize,
    },

    /// 参数值非法
    #[error("参数 {name} 值非法: {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    /// 配置文件读取或解析失败
    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO 失败
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),
}
