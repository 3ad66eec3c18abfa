//! 通用工具模块
pub mod list;

pub use self::list::{comma_list, dedup_ordered, split_comma_list};
