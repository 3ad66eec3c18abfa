//! 规则目录
//! 将用户选择的分类与自定义规则展开为具体规则元组及去重后的规则集列表

use std::collections::HashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::model::{
    CustomRule, Preset, ResolvedRules, RuleSelection, RuleSetFormat, RuleSetKind, RuleSetRef,
    RuleTuple, RuleTarget,
};
use crate::config::BuilderConfig;
use crate::document::{DIRECT, GLOBAL, REJECT};
use crate::error::{BuilderError, BuilderResult};
use crate::i18n::{AUTO_SELECT, FALL_BACK, NODE_SELECT};
use crate::utils::dedup_ordered;

/// IP 规则集标签后缀，区分同名的 geosite 规则集
pub const IP_RULE_SET_SUFFIX: &str = "-ip";

/// 广告拦截分类（使用 reject 动作而非出站）
pub const AD_BLOCK: &str = "Ad Block";

/// 预定义分类
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub name: &'static str,
    pub site_rules: &'static [&'static str],
    pub ip_rules: &'static [&'static str],
}

/// 内置分类目录，顺序即匹配优先级
pub static UNIFIED_RULES: &[CategoryDef] = &[
    CategoryDef { name: "Ad Block", site_rules: &["category-ads-all"], ip_rules: &[] },
    CategoryDef { name: "AI Services", site_rules: &["category-ai-!cn"], ip_rules: &[] },
    CategoryDef { name: "Bilibili", site_rules: &["bilibili"], ip_rules: &[] },
    CategoryDef { name: "Youtube", site_rules: &["youtube"], ip_rules: &[] },
    CategoryDef { name: "Google", site_rules: &["google"], ip_rules: &["google"] },
    CategoryDef { name: "Private", site_rules: &[], ip_rules: &["private"] },
    CategoryDef { name: "Location:CN", site_rules: &["geolocation-cn"], ip_rules: &["cn"] },
    CategoryDef { name: "Telegram", site_rules: &[], ip_rules: &["telegram"] },
    CategoryDef { name: "Github", site_rules: &["github", "gitlab"], ip_rules: &[] },
    CategoryDef { name: "Microsoft", site_rules: &["microsoft"], ip_rules: &[] },
    CategoryDef { name: "Apple", site_rules: &["apple"], ip_rules: &[] },
    CategoryDef {
        name: "Social Media",
        site_rules: &["facebook", "instagram", "twitter", "tiktok", "linkedin"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Streaming",
        site_rules: &["netflix", "hulu", "disney", "hbo", "amazon", "bahamut"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Gaming",
        site_rules: &["steam", "epicgames", "ea", "ubisoft", "blizzard"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Education",
        site_rules: &["coursera", "edx", "udemy", "khanacademy", "category-scholar-!cn"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Financial",
        site_rules: &["paypal", "visa", "mastercard", "stripe", "wise"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Cloud Services",
        site_rules: &["aws", "azure", "digitalocean", "heroku", "dropbox"],
        ip_rules: &[],
    },
    CategoryDef { name: "Non-China", site_rules: &["geolocation-!cn"], ip_rules: &[] },
];

const MINIMAL: &[&str] = &["Location:CN", "Private", "Non-China"];
const BALANCED: &[&str] = &[
    "Location:CN", "Private", "Non-China", "Github", "Google", "Youtube", "AI Services", "Telegram",
];

/// 规则集名称合法字符
static RULE_SET_NAME_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_!@.\-]+$"));

/// 查找预定义分类
pub fn find_category(name: &str) -> Option<&'static CategoryDef> {
    UNIFIED_RULES.iter().find(|def| def.name == name)
}

impl Preset {
    /// 预设对应的分类列表
    pub fn categories(&self) -> Vec<String> {
        match self {
            Preset::Minimal => MINIMAL.iter().map(|s| s.to_string()).collect(),
            Preset::Balanced => BALANCED.iter().map(|s| s.to_string()).collect(),
            Preset::Comprehensive => UNIFIED_RULES.iter().map(|def| def.name.to_string()).collect(),
        }
    }
}

impl RuleSelection {
    /// 展开为有序分类列表：去重，去除“节点选择”
    pub fn categories(&self) -> Vec<String> {
        let raw = match self {
            RuleSelection::Preset(preset) => preset.categories(),
            RuleSelection::Categories(list) => list.clone(),
        };
        dedup_ordered(
            raw.into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty() && c != NODE_SELECT),
            |c| c.clone(),
        )
    }
}

/// 规则目录解析器
pub trait RuleCatalog {
    /// 解析分类与自定义规则
    fn resolve(&self, selected: &[String], custom_rules: &[CustomRule]) -> BuilderResult<ResolvedRules>;
}

/// 内置分类目录解析器
#[derive(Debug, Clone)]
pub struct PredefinedCatalog {
    site_base: Url,
    ip_base: Url,
    gh_proxy_url: Option<String>,
    download_detour: Option<String>,
}

impl PredefinedCatalog {
    pub fn new(config: &BuilderConfig) -> BuilderResult<Self> {
        Ok(Self {
            site_base: Self::parse_base(&config.site_rule_set_base_url)?,
            ip_base: Self::parse_base(&config.ip_rule_set_base_url)?,
            gh_proxy_url: config.gh_proxy_url.clone().filter(|u| !u.trim().is_empty()),
            download_detour: config.rule_set_download_detour.clone(),
        })
    }

    /// 基础地址补齐结尾斜杠，保证 join 时追加而非替换末段
    fn parse_base(raw: &str) -> BuilderResult<Url> {
        let raw = raw.trim();
        if raw.ends_with('/') {
            Ok(Url::parse(raw)?)
        } else {
            Ok(Url::parse(&format!("{}/", raw))?)
        }
    }

    fn rule_set_url(&self, base: &Url, file_name: &str) -> BuilderResult<String> {
        let url = base.join(file_name)?;
        Ok(match &self.gh_proxy_url {
            Some(proxy) => format!("{}{}", proxy, url),
            None => url.to_string(),
        })
    }

    fn site_rule_set(&self, name: &str) -> BuilderResult<RuleSetRef> {
        Ok(RuleSetRef {
            tag: name.to_string(),
            kind: RuleSetKind::Remote,
            format: RuleSetFormat::Binary,
            url: self.rule_set_url(&self.site_base, &format!("geosite-{}.srs", name))?,
            download_detour: self.download_detour.clone(),
        })
    }

    fn ip_rule_set(&self, name: &str) -> BuilderResult<RuleSetRef> {
        Ok(RuleSetRef {
            tag: format!("{}{}", name, IP_RULE_SET_SUFFIX),
            kind: RuleSetKind::Remote,
            format: RuleSetFormat::Binary,
            url: self.rule_set_url(&self.ip_base, &format!("geoip-{}.srs", name))?,
            download_detour: self.download_detour.clone(),
        })
    }

    /// 校验自定义规则
    fn validate_custom_rules(custom_rules: &[CustomRule]) -> BuilderResult<()> {
        let name_regex = RULE_SET_NAME_REGEX
            .as_ref()
            .map_err(|e| BuilderError::RegexCompileError(e.clone()))?;
        let reserved = [NODE_SELECT, AUTO_SELECT, FALL_BACK, DIRECT, REJECT, GLOBAL];
        let mut seen = HashSet::new();

        for rule in custom_rules {
            let name = rule.name.trim();
            if name.is_empty() {
                return Err(BuilderError::InvalidCustomRule("规则名不能为空".to_string()));
            }
            if reserved.contains(&name) || find_category(name).is_some() {
                return Err(BuilderError::InvalidCustomRule(format!(
                    "规则名 {} 与内置分组冲突",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(BuilderError::InvalidCustomRule(format!("规则名 {} 重复", name)));
            }
            if rule.has_no_criteria() {
                return Err(BuilderError::InvalidCustomRule(format!(
                    "规则 {} 没有任何匹配条件",
                    name
                )));
            }
            if let Some(bad) = rule
                .site
                .iter()
                .chain(rule.ip.iter())
                .find(|item| !name_regex.is_match(item))
            {
                return Err(BuilderError::InvalidCustomRule(format!(
                    "规则 {} 的规则集名称非法：{}",
                    name, bad
                )));
            }
        }
        Ok(())
    }

    fn custom_tuple(rule: &CustomRule) -> RuleTuple {
        let non_empty = |list: &Vec<String>| (!list.is_empty()).then(|| list.clone());
        RuleTuple {
            target: RuleTarget::Custom(rule.name.trim().to_string()),
            site_rules: rule.site.clone(),
            ip_rules: rule.ip.clone(),
            domain_suffix: non_empty(&rule.domain_suffix),
            domain_keyword: non_empty(&rule.domain_keyword),
            ip_cidr: non_empty(&rule.ip_cidr),
            protocol: non_empty(&rule.protocol),
        }
    }
}

impl RuleCatalog for PredefinedCatalog {
    fn resolve(&self, selected: &[String], custom_rules: &[CustomRule]) -> BuilderResult<ResolvedRules> {
        // 1. 校验输入
        Self::validate_custom_rules(custom_rules)?;
        let mut selected_set = HashSet::new();
        for category in selected {
            if category == NODE_SELECT {
                continue;
            }
            if find_category(category).is_none() {
                return Err(BuilderError::UnknownCategory(category.clone()));
            }
            selected_set.insert(category.as_str());
        }

        // 2. 自定义规则优先，其后按目录顺序追加分类规则
        let mut rules: Vec<RuleTuple> = custom_rules.iter().map(Self::custom_tuple).collect();
        rules.extend(
            UNIFIED_RULES
                .iter()
                .filter(|def| selected_set.contains(def.name))
                .map(|def| RuleTuple::for_category(def.name, def.site_rules, def.ip_rules)),
        );

        // 3. 从规则元组汇总规则集，保序去重
        let site_names = dedup_ordered(
            rules
                .iter()
                .flat_map(|r| r.site_rules.iter())
                .filter(|s| !s.trim().is_empty()),
            |s| s.to_string(),
        );
        let ip_names = dedup_ordered(
            rules
                .iter()
                .flat_map(|r| r.ip_rules.iter())
                .filter(|s| !s.trim().is_empty()),
            |s| s.to_string(),
        );

        let site_rule_sets = site_names
            .into_iter()
            .map(|name| self.site_rule_set(name))
            .collect::<BuilderResult<Vec<_>>>()?;
        let ip_rule_sets = ip_names
            .into_iter()
            .map(|name| self.ip_rule_set(name))
            .collect::<BuilderResult<Vec<_>>>()?;

        debug!(
            "规则目录解析完成：规则{}条、geosite规则集{}个、geoip规则集{}个",
            rules.len(),
            site_rule_sets.len(),
            ip_rule_sets.len()
        );

        Ok(ResolvedRules {
            rules,
            site_rule_sets,
            ip_rule_sets,
        })
    }
}
