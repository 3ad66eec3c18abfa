//! 全局配置管理,存储所有可配置项

use crate::i18n::Locale;

/// 默认 geosite 规则集地址
pub const DEFAULT_SITE_RULE_SET_BASE_URL: &str =
    "https://raw.githubusercontent.com/lyc8503/sing-box-rules/rule-set-geosite/";
/// 默认 geoip 规则集地址
pub const DEFAULT_IP_RULE_SET_BASE_URL: &str =
    "https://raw.githubusercontent.com/lyc8503/sing-box-rules/rule-set-geoip/";

/// 优先直连的分类
pub const DEFAULT_DIRECT_PREFERRED: [&str; 3] = ["Private", "Location:CN", "Bilibili"];

/// 自动选择组的测速参数（均为空时不输出）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlTestOptions {
    pub url: Option<String>,
    pub interval: Option<String>,
    pub tolerance: Option<u32>,
}

impl UrlTestOptions {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.interval.is_none() && self.tolerance.is_none()
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    // 输出语言
    pub locale: Locale,
    // geosite 规则集基础地址
    pub site_rule_set_base_url: String,
    // geoip 规则集基础地址
    pub ip_rule_set_base_url: String,
    // GitHub代理URL（拼接在规则集地址之前）
    pub gh_proxy_url: Option<String>,
    // 规则集下载出站
    pub rule_set_download_detour: Option<String>,
    // 优先直连的分类
    pub direct_preferred: Vec<String>,
    // 自动选择组测速参数
    pub url_test: UrlTestOptions,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            site_rule_set_base_url: DEFAULT_SITE_RULE_SET_BASE_URL.to_string(),
            ip_rule_set_base_url: DEFAULT_IP_RULE_SET_BASE_URL.to_string(),
            gh_proxy_url: None,
            rule_set_download_detour: None,
            direct_preferred: DEFAULT_DIRECT_PREFERRED.iter().map(|s| s.to_string()).collect(),
            url_test: UrlTestOptions::default(),
        }
    }
}

impl BuilderConfig {
    /// 分类是否优先直连
    pub fn prefers_direct(&self, category: &str) -> bool {
        self.direct_preferred.iter().any(|c| c == category)
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> BuilderConfig {
        BuilderConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: BuilderConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BuilderConfig::default(),
        }
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    pub fn site_rule_set_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_rule_set_base_url = url.into();
        self
    }

    pub fn ip_rule_set_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ip_rule_set_base_url = url.into();
        self
    }

    pub fn gh_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.gh_proxy_url = Some(url.into());
        self
    }

    pub fn rule_set_download_detour(mut self, detour: impl Into<String>) -> Self {
        self.config.rule_set_download_detour = Some(detour.into());
        self
    }

    pub fn direct_preferred<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.direct_preferred = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn url_test(mut self, options: UrlTestOptions) -> Self {
        self.config.url_test = options;
        self
    }

    pub fn build(self) -> BuilderConfig {
        self.config
    }
}
