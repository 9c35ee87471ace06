//! 实用工具模块
//!
//! 提供遥测值的格式化功能

pub mod value_formatter;

// 重新导出常用函数
pub use value_formatter::{
    format_difficulty, format_hashrate, format_uptime, format_voltage, ScaleProfile,
    ValueFormatter,
};
