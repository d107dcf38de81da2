/// 变量提取模块 - 从响应中提取值写入变量作用域
mod engine;
mod types;

pub use engine::{extract, try_extract};
pub use types::{ExtractionMiss, ExtractionRecord, ExtractionRule, ExtractionSource, MissPolicy};
