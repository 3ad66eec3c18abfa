//! 配置编译器核心
//! 单次、同步、全有或全无：任一阶段失败都不会向调用方暴露半成品文档

use std::sync::Arc;
use std::time::Instant;
use serde_json::Value;
use tracing::{debug, info};

use super::group::GroupAssembler;
use super::route::RouteCompiler;
use crate::config::BuilderConfig;
use crate::document::{
    BaseTemplate, ConfigDocument, DocumentAssembler, OutboundFormat, ProxyDescriptor, SharedFormat,
    SingBoxFormat,
};
use crate::error::BuilderResult;
use crate::i18n::NameResolver;
use crate::rule::{CustomRule, PredefinedCatalog, RuleCatalog, RuleSelection};

/// 单次编译输入
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub proxies: Vec<ProxyDescriptor>,
    pub selection: RuleSelection,
    pub custom_rules: Vec<CustomRule>,
}

impl CompileRequest {
    pub fn new(proxies: Vec<ProxyDescriptor>) -> Self {
        Self {
            proxies,
            ..Default::default()
        }
    }

    pub fn selection(mut self, selection: impl Into<RuleSelection>) -> Self {
        self.selection = selection.into();
        self
    }

    pub fn custom_rules(mut self, custom_rules: Vec<CustomRule>) -> Self {
        self.custom_rules = custom_rules;
        self
    }
}

/// 配置编译器
/// 模板、规则目录、名称解析与目标格式均可注入
#[derive(Clone)]
pub struct ConfigCompiler {
    config: BuilderConfig,
    template: BaseTemplate,
    catalog: Arc<dyn RuleCatalog + Send + Sync>,
    names: Arc<dyn NameResolver + Send + Sync>,
    format: SharedFormat,
}

impl ConfigCompiler {
    /// 使用内置模板、内置目录与 sing-box 格式创建编译器
    pub fn new(config: BuilderConfig) -> BuilderResult<Self> {
        let template = BaseTemplate::builtin()?;
        let catalog = PredefinedCatalog::new(&config)?;
        Ok(Self {
            names: Arc::new(config.locale),
            catalog: Arc::new(catalog),
            format: Arc::new(SingBoxFormat),
            template,
            config,
        })
    }

    pub fn with_template(mut self, template: BaseTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_catalog(mut self, catalog: impl RuleCatalog + Send + Sync + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_name_resolver(mut self, names: impl NameResolver + Send + Sync + 'static) -> Self {
        self.names = Arc::new(names);
        self
    }

    pub fn with_format(mut self, format: impl OutboundFormat + Send + Sync + 'static) -> Self {
        self.format = Arc::new(format);
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn template(&self) -> &BaseTemplate {
        &self.template
    }

    /// 编译配置文档
    pub fn compile(&self, request: &CompileRequest) -> BuilderResult<ConfigDocument> {
        let start = Instant::now();
        let names: &dyn NameResolver = &*self.names;

        // 1. 展开规则选择，分组与路由共用同一份分类列表
        let categories = request.selection.categories();

        // 2. 解析规则目录并校验自定义规则名（出错直接返回）
        let resolved = self.catalog.resolve(&categories, &request.custom_rules)?;
        GroupAssembler::check_custom_names(names, &categories, &request.custom_rules)?;

        // 3. 播种文档并写入节点，节点不得占用分组标签
        let mut document = DocumentAssembler::seed(&self.template, Arc::clone(&self.format), names)?;
        let reserved = GroupAssembler::reserved_tags(names, &categories, &request.custom_rules);
        let added = DocumentAssembler::add_proxies(&mut document, &request.proxies, &reserved);
        debug!("写入节点{}个（输入{}个）", added, request.proxies.len());

        // 4. 装配分组
        GroupAssembler::assemble(
            &mut document,
            names,
            &self.config,
            &categories,
            &request.custom_rules,
        );

        // 5. 编译路由
        RouteCompiler::compile(&mut document, names, resolved)?;

        info!("✅ 配置编译完成，总耗时{:?}", start.elapsed());
        Ok(DocumentAssembler::finalize(document))
    }

    /// 编译并渲染为 JSON
    pub fn compile_value(&self, request: &CompileRequest) -> BuilderResult<Value> {
        self.compile(request)?.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::document::{Member, OutboundEntry, RuleAction};
    use crate::error::BuilderError;
    use crate::i18n::Locale;
    use crate::rule::{Preset, ResolvedRules};
    use serde_json::json;

    fn identity(key: &str) -> String {
        key.to_string()
    }

    fn compiler() -> ConfigCompiler {
        ConfigCompiler::new(ConfigManager::get_default())
            .unwrap()
            .with_name_resolver(identity)
    }

    fn proxy(tag: &str) -> ProxyDescriptor {
        ProxyDescriptor::new("trojan", tag)
            .with_field("server", format!("{}.example.com", tag.to_lowercase()))
            .with_field("server_port", 443)
    }

    fn outbound_summary(value: &Value) -> Vec<(String, Option<Value>)> {
        value["outbounds"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| (o["tag"].as_str().unwrap().to_string(), o.get("outbounds").cloned()))
            .collect()
    }

    #[test]
    fn test_ad_block_private_example() {
        let request = CompileRequest::new(vec![proxy("P1"), proxy("P2")])
            .selection(&["Ad Block", "Private"][..]);
        let value = compiler().compile_value(&request).unwrap();

        assert_eq!(
            outbound_summary(&value),
            vec![
                ("Node Select".to_string(), Some(json!(["P1", "P2"]))),
                ("Auto Select".to_string(), Some(json!(["P1", "P2"]))),
                ("Ad Block".to_string(), Some(json!(["REJECT", "DIRECT"]))),
                ("Private".to_string(), Some(json!(["DIRECT", "P1", "P2"]))),
                ("Fall Back".to_string(), Some(json!(["Node Select", "P1", "P2"]))),
                ("DIRECT".to_string(), None),
                ("REJECT".to_string(), None),
                ("P1".to_string(), None),
                ("P2".to_string(), None),
            ]
        );
        assert_eq!(value["outbounds"][0]["type"], json!("selector"));
        assert_eq!(value["outbounds"][1]["type"], json!("urltest"));
        assert_eq!(value["outbounds"][7]["server_port"], json!(443));
        assert_eq!(value["dns"]["servers"][0]["detour"], json!("Node Select"));
        assert_eq!(value["route"]["final"], json!("Fall Back"));
        assert_eq!(value["route"]["auto_detect_interface"], json!(true));
    }

    #[test]
    fn test_empty_selection_still_has_core_groups() {
        let request = CompileRequest::new(vec![proxy("P1")]);
        let doc = compiler().compile(&request).unwrap();
        let tags: Vec<_> = doc.outbounds().iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["Node Select", "Auto Select", "Fall Back", "DIRECT", "REJECT", "P1"]);
        assert_eq!(doc.route().rules, RouteCompiler::bootstrap_rules());
    }

    #[test]
    fn test_auto_select_is_snapshot_node_select_is_live() {
        let request = CompileRequest::new(vec![proxy("P1"), proxy("P2")]);
        let mut doc = compiler().compile(&request).unwrap();
        doc.push_node(proxy("P3"));

        let value = doc.to_value().unwrap();
        assert_eq!(value["outbounds"][0]["outbounds"], json!(["P1", "P2", "P3"]));
        assert_eq!(value["outbounds"][1]["outbounds"], json!(["P1", "P2"]));
        assert_eq!(
            doc.group("Node Select").unwrap().members,
            vec![Member::AllProxies]
        );
    }

    #[test]
    fn test_rule_effects_per_category() {
        let request = CompileRequest::new(vec![proxy("P1")])
            .selection(&["Ad Block", "Youtube", "Location:CN"][..]);
        let doc = compiler().compile(&request).unwrap();
        let rules = &doc.route().rules;
        assert_eq!(&rules[..4], &RouteCompiler::bootstrap_rules()[..]);
        for rule in &rules[4..] {
            if rule.rule_set == vec!["category-ads-all"] {
                assert_eq!(rule.action, Some(RuleAction::Reject));
                assert!(rule.outbound.is_none());
            } else {
                assert!(rule.action.is_none());
                let target = rule.outbound.as_deref().unwrap();
                assert!(doc.group(target).is_some(), "规则出站 {} 没有对应分组", target);
            }
        }
    }

    #[test]
    fn test_every_reference_resolves() {
        let mut custom = CustomRule::new("Work");
        custom.site = vec!["microsoft".to_string()];
        let request = CompileRequest::new(vec![proxy("P1"), proxy("P2")])
            .selection(Preset::Comprehensive)
            .custom_rules(vec![custom]);
        let compiler = ConfigCompiler::new(ConfigManager::get_default()).unwrap();
        let doc = compiler.compile(&request).unwrap();
        let value = doc.to_value().unwrap();

        let sentinels = ["DIRECT", "REJECT", "GLOBAL"];
        let outbounds = value["outbounds"].as_array().unwrap();
        for (idx, outbound) in outbounds.iter().enumerate() {
            let Some(members) = outbound.get("outbounds").and_then(Value::as_array) else {
                continue;
            };
            for member in members {
                let member = member.as_str().unwrap();
                let defined_earlier_or_node = outbounds.iter().enumerate().any(|(other_idx, other)| {
                    other["tag"] == json!(member) && (other.get("outbounds").is_none() || other_idx < idx)
                });
                assert!(
                    sentinels.contains(&member) || defined_earlier_or_node,
                    "{} 引用了未定义的 {}",
                    outbound["tag"],
                    member
                );
            }
        }
        for rule in doc.route().rules.iter().filter_map(|r| r.outbound.as_deref()) {
            assert!(sentinels.contains(&rule) || doc.group(rule).is_some(), "未知出站 {}", rule);
        }
        assert_eq!(value["route"]["final"], json!("🐟 漏网之鱼"));
    }

    #[test]
    fn test_compile_is_deterministic_and_template_untouched() {
        let compiler = ConfigCompiler::new(ConfigManager::custom().locale(Locale::EnUs).build()).unwrap();
        let request = CompileRequest::new(vec![proxy("P1")]).selection(Preset::Balanced);
        let first = compiler.compile_value(&request).unwrap();
        let second = compiler.compile_value(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            BaseTemplate::builtin().unwrap().value()["dns"]["servers"][0]["detour"],
            json!("Node Select")
        );

        // 不同语言的编译互不影响
        let zh = ConfigCompiler::new(ConfigManager::get_default()).unwrap();
        let zh_value = zh.compile_value(&request).unwrap();
        assert_eq!(zh_value["dns"]["servers"][0]["detour"], json!("🚀 节点选择"));
        assert_eq!(compiler.compile_value(&request).unwrap(), first);
    }

    #[test]
    fn test_resolver_error_propagates() {
        let request = CompileRequest::new(vec![proxy("P1")]).selection(&["Google", "Mars"][..]);
        let err = compiler().compile(&request).unwrap_err();
        assert!(matches!(err, BuilderError::UnknownCategory(name) if name == "Mars"));

        let request = CompileRequest::new(vec![proxy("P1")]).custom_rules(vec![CustomRule::new("Empty")]);
        assert!(matches!(
            compiler().compile(&request),
            Err(BuilderError::InvalidCustomRule(_))
        ));
    }

    struct StaticCatalog;

    impl RuleCatalog for StaticCatalog {
        fn resolve(&self, _selected: &[String], _custom: &[CustomRule]) -> BuilderResult<ResolvedRules> {
            Ok(ResolvedRules::default())
        }
    }

    #[test]
    fn test_injected_collaborators() {
        let template = BaseTemplate::from_value(json!({
            "log": {"level": "warn"},
            "outbounds": [{"type": "direct", "tag": "DIRECT"}]
        }))
        .unwrap();
        let compiler = compiler()
            .with_template(template)
            .with_catalog(StaticCatalog)
            .with_name_resolver(|key: &str| format!("[{}]", key));
        let request = CompileRequest::new(vec![proxy("P1")]).selection(&["Anything"][..]);
        let doc = compiler.compile(&request).unwrap();

        let tags: Vec<_> = doc.outbounds().iter().map(OutboundEntry::tag).collect();
        assert_eq!(
            tags,
            vec!["[Node Select]", "[Auto Select]", "[Anything]", "[Fall Back]", "DIRECT", "P1"]
        );
        assert_eq!(doc.route().rules.len(), 4);
        assert_eq!(doc.to_value().unwrap()["log"], json!({"level": "warn"}));
    }

    #[test]
    fn test_duplicate_selection_collapsed() {
        let request = CompileRequest::new(vec![proxy("P1")])
            .selection(&["Google", "Google", "Node Select"][..]);
        let doc = compiler().compile(&request).unwrap();
        assert_eq!(doc.groups().filter(|g| g.tag == "Google").count(), 1);
        assert_eq!(doc.route().rules.len(), 5);
    }

    fn duplicate_tags(value: &Value) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        value["outbounds"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|o| o["tag"].as_str())
            .filter(|tag| !seen.insert(*tag))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_proxy_named_like_group_is_renamed() {
        let zh = ConfigCompiler::new(ConfigManager::get_default()).unwrap();
        let request = CompileRequest::new(vec![proxy("🐟 漏网之鱼"), proxy("🔍 谷歌服务"), proxy("P2")])
            .selection(&["Google"][..]);
        let value = zh.compile_value(&request).unwrap();

        assert!(duplicate_tags(&value).is_empty(), "重复标签：{:?}", duplicate_tags(&value));
        assert_eq!(value["route"]["final"], json!("🐟 漏网之鱼"));
        assert_eq!(
            value["outbounds"][0]["outbounds"],
            json!(["🐟 漏网之鱼 2", "🔍 谷歌服务 2", "P2"])
        );
        let fallback = value["outbounds"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["tag"] == json!("🐟 漏网之鱼"))
            .unwrap();
        assert_eq!(fallback["type"], json!("selector"));
    }

    #[test]
    fn test_custom_rule_named_like_group_is_rejected() {
        let rule = |name: &str| {
            let mut rule = CustomRule::new(name);
            rule.domain_suffix = vec!["a.com".to_string()];
            rule
        };

        let zh = ConfigCompiler::new(ConfigManager::get_default()).unwrap();
        let request = CompileRequest::new(vec![proxy("P1")]).custom_rules(vec![rule("🚀 节点选择")]);
        assert!(matches!(zh.compile(&request), Err(BuilderError::InvalidCustomRule(_))));

        let en = ConfigCompiler::new(ConfigManager::custom().locale(Locale::EnUs).build()).unwrap();
        let request = CompileRequest::new(vec![proxy("P1")]).custom_rules(vec![rule("🚀 Node Select")]);
        assert!(matches!(en.compile(&request), Err(BuilderError::InvalidCustomRule(_))));

        // 其他语言的显示名不冲突
        let request = CompileRequest::new(vec![proxy("P1")]).custom_rules(vec![rule("🚀 节点选择")]);
        let value = en.compile_value(&request).unwrap();
        assert!(duplicate_tags(&value).is_empty());
    }

    struct TrojanOnly;

    impl OutboundFormat for TrojanOnly {
        fn proxies<'a>(&self, document: &'a ConfigDocument) -> Vec<&'a ProxyDescriptor> {
            document.nodes().filter(|node| node.kind == "trojan").collect()
        }

        fn proxy_name<'a>(&self, proxy: &'a ProxyDescriptor) -> &'a str {
            &proxy.tag
        }

        fn convert_proxy(&self, proxy: &ProxyDescriptor) -> Option<ProxyDescriptor> {
            Some(proxy.clone())
        }

        fn add_proxy(&self, document: &mut ConfigDocument, proxy: ProxyDescriptor) {
            document.push_node(proxy);
        }
    }

    #[test]
    fn test_injected_format_drives_every_group() {
        let shadowsocks = ProxyDescriptor::new("shadowsocks", "SS1").with_field("server", "ss1.example.com");
        let request = CompileRequest::new(vec![proxy("T1"), shadowsocks]).selection(&["Youtube"][..]);
        let doc = compiler().with_format(TrojanOnly).compile(&request).unwrap();
        let value = doc.to_value().unwrap();

        assert_eq!(value["outbounds"][0]["tag"], json!("Node Select"));
        assert_eq!(value["outbounds"][0]["outbounds"], json!(["T1"]));
        assert_eq!(value["outbounds"][1]["outbounds"], json!(["T1"]));
        assert_eq!(value["outbounds"][2]["outbounds"], json!(["Node Select", "T1", "DIRECT"]));
        assert_eq!(doc.proxy_tags(), vec!["T1"]);
    }

    struct LooseCatalog {
        declare: bool,
    }

    impl RuleCatalog for LooseCatalog {
        fn resolve(&self, _selected: &[String], _custom: &[CustomRule]) -> BuilderResult<ResolvedRules> {
            let remote = |tag: &str| crate::rule::RuleSetRef {
                tag: tag.to_string(),
                kind: crate::rule::RuleSetKind::Remote,
                format: crate::rule::RuleSetFormat::Binary,
                url: format!("https://example.com/{}.srs", tag),
                download_detour: None,
            };
            let declared = if self.declare { vec![remote("x")] } else { Vec::new() };
            Ok(ResolvedRules {
                rules: vec![crate::rule::RuleTuple::for_category("Google", &["x"], &[])],
                site_rule_sets: declared,
                ip_rule_sets: vec![remote("unused-ip")],
            })
        }
    }

    #[test]
    fn test_injected_catalog_rule_sets_match_rule_refs() {
        let request = CompileRequest::new(vec![proxy("P1")]).selection(&["Google"][..]);

        let err = compiler()
            .with_catalog(LooseCatalog { declare: false })
            .compile(&request)
            .unwrap_err();
        assert!(matches!(err, BuilderError::UndeclaredRuleSet(tag) if tag == "x"));

        let doc = compiler()
            .with_catalog(LooseCatalog { declare: true })
            .compile(&request)
            .unwrap();
        let tags: Vec<_> = doc.route().rule_set.iter().map(|rs| rs.tag.as_str()).collect();
        assert_eq!(tags, vec!["x"]);
    }
}
