//! 名称本地化模块：将内部分组标识映射为当前语言的显示名称
pub mod names;

use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::BuilderError;

/// 内部分组标识：节点选择
pub const NODE_SELECT: &str = "Node Select";
/// 内部分组标识：自动选择
pub const AUTO_SELECT: &str = "Auto Select";
/// 内部分组标识：漏网之鱼
pub const FALL_BACK: &str = "Fall Back";

/// 名称解析器
/// 必须对所有分类标识与内部分组标识全覆盖，未知标识原样返回
pub trait NameResolver {
    fn resolve(&self, key: &str) -> String;
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, key: &str) -> String {
        self(key)
    }
}

/// 支持的输出语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    #[default]
    ZhCn,
    EnUs,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::EnUs => "en-US",
        }
    }

    /// 宽松解析：无法识别时回退默认语言
    pub fn parse_lossy(code: &str) -> Self {
        code.parse().unwrap_or_else(|_| {
            warn!("不支持的语言 {}，回退为 {}", code, Locale::default().code());
            Locale::default()
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zh" | "zh-cn" | "zh-hans" => Ok(Locale::ZhCn),
            "en" | "en-us" | "en-gb" => Ok(Locale::EnUs),
            other => Err(BuilderError::InvalidInput(format!("未知语言：{}", other))),
        }
    }
}

impl NameResolver for Locale {
    fn resolve(&self, key: &str) -> String {
        names::lookup(*self, key)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}
