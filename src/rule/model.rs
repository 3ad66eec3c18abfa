//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::BuilderError;
use crate::utils::comma_list;

/// 用户自定义规则
/// 各匹配字段兼容逗号分隔字符串与数组两种写法
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,
    #[serde(default, deserialize_with = "comma_list")]
    pub site: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub ip: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub domain_suffix: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub domain_keyword: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub ip_cidr: Vec<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub protocol: Vec<String>,
}

impl CustomRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 是否没有任何匹配条件
    pub fn has_no_criteria(&self) -> bool {
        self.site.is_empty()
            && self.ip.is_empty()
            && self.domain_suffix.is_empty()
            && self.domain_keyword.is_empty()
            && self.ip_cidr.is_empty()
            && self.protocol.is_empty()
    }
}

/// 规则指向的出站
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// 预定义分类（显示名称需经名称解析）
    Category(String),
    /// 自定义规则（直接使用规则名）
    Custom(String),
}

impl RuleTarget {
    pub fn key(&self) -> &str {
        match self {
            RuleTarget::Category(name) | RuleTarget::Custom(name) => name,
        }
    }
}

/// 解析后的单条规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTuple {
    pub target: RuleTarget,
    pub site_rules: Vec<String>,
    pub ip_rules: Vec<String>,
    pub domain_suffix: Option<Vec<String>>,
    pub domain_keyword: Option<Vec<String>>,
    pub ip_cidr: Option<Vec<String>>,
    pub protocol: Option<Vec<String>>,
}

impl RuleTuple {
    pub fn for_category(name: &str, site_rules: &[&str], ip_rules: &[&str]) -> Self {
        Self {
            target: RuleTarget::Category(name.to_string()),
            site_rules: site_rules.iter().map(|s| s.to_string()).collect(),
            ip_rules: ip_rules.iter().map(|s| s.to_string()).collect(),
            domain_suffix: None,
            domain_keyword: None,
            ip_cidr: None,
            protocol: None,
        }
    }
}

/// 规则集类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetKind {
    Remote,
}

/// 规则集文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetFormat {
    Binary,
}

/// 路由中声明的规则集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetRef {
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: RuleSetKind,
    pub format: RuleSetFormat,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_detour: Option<String>,
}

/// 规则目录解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRules {
    pub rules: Vec<RuleTuple>,
    pub site_rule_sets: Vec<RuleSetRef>,
    pub ip_rule_sets: Vec<RuleSetRef>,
}

/// 预设规则组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Minimal,
    Balanced,
    Comprehensive,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Minimal => "minimal",
            Preset::Balanced => "balanced",
            Preset::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Preset::Minimal),
            "balanced" => Ok(Preset::Balanced),
            "comprehensive" => Ok(Preset::Comprehensive),
            _ => Err(BuilderError::UnknownPreset(s.to_string())),
        }
    }
}

/// 用户的规则选择：预设名或显式分类列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelection {
    Preset(Preset),
    Categories(Vec<String>),
}

impl Default for RuleSelection {
    fn default() -> Self {
        RuleSelection::Categories(Vec::new())
    }
}

impl From<Preset> for RuleSelection {
    fn from(preset: Preset) -> Self {
        RuleSelection::Preset(preset)
    }
}

impl From<Vec<String>> for RuleSelection {
    fn from(categories: Vec<String>) -> Self {
        RuleSelection::Categories(categories)
    }
}

impl From<&[&str]> for RuleSelection {
    fn from(categories: &[&str]) -> Self {
        RuleSelection::Categories(categories.iter().map(|s| s.to_string()).collect())
    }
}
