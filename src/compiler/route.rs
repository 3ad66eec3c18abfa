//! 路由编译
//! 将规则元组展开为有序路由规则，前置引导规则并设置兜底出站

use std::collections::HashSet;
use tracing::debug;

use crate::document::{ConfigDocument, RoutingRule, RuleAction, DIRECT, GLOBAL};
use crate::error::{BuilderError, BuilderResult};
use crate::i18n::{NameResolver, FALL_BACK};
use crate::rule::{ResolvedRules, RuleTarget, RuleTuple, AD_BLOCK, IP_RULE_SET_SUFFIX};
use crate::utils::dedup_ordered;

/// 路由编译器
pub struct RouteCompiler;

impl RouteCompiler {
    /// 写入路由段
    /// 声明的规则集恰为规则实际引用的集合；引用了未声明的规则集时报错且不修改文档
    pub fn compile(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        resolved: ResolvedRules,
    ) -> BuilderResult<()> {
        let ResolvedRules {
            rules: tuples,
            site_rule_sets,
            ip_rule_sets,
        } = resolved;

        // 1. 引导规则在前，分类规则按解析顺序在后
        let mut rules = Self::bootstrap_rules();
        rules.extend(tuples.iter().map(|tuple| Self::routing_rule(tuple, names)));

        // 2. 规则集：geosite 在前、geoip 在后，按标签去重
        let declared = dedup_ordered(site_rule_sets.into_iter().chain(ip_rule_sets), |rs| rs.tag.clone());
        let declared_tags: HashSet<&str> = declared.iter().map(|rs| rs.tag.as_str()).collect();
        if let Some(missing) = rules
            .iter()
            .flat_map(|rule| rule.rule_set.iter())
            .find(|tag| !declared_tags.contains(tag.as_str()))
        {
            return Err(BuilderError::UndeclaredRuleSet(missing.clone()));
        }

        // 3. 丢弃未被任何规则引用的规则集
        let used: HashSet<&str> = rules
            .iter()
            .flat_map(|rule| rule.rule_set.iter().map(String::as_str))
            .collect();
        let declared_count = declared.len();
        let rule_set: Vec<_> = declared
            .iter()
            .filter(|rs| used.contains(rs.tag.as_str()))
            .cloned()
            .collect();
        if rule_set.len() < declared_count {
            debug!("丢弃未引用的规则集{}个", declared_count - rule_set.len());
        }

        debug!("路由编译完成：规则{}条、规则集{}个", rules.len(), rule_set.len());

        let route = document.route_mut();
        route.rule_set = rule_set;
        route.rules = rules;
        route.auto_detect_interface = Some(true);
        route.final_outbound = Some(names.resolve(FALL_BACK));
        Ok(())
    }

    /// 固定引导规则：流量嗅探、DNS 劫持、clash 模式直连/全局
    pub fn bootstrap_rules() -> Vec<RoutingRule> {
        vec![
            RoutingRule::action(RuleAction::Sniff),
            RoutingRule {
                protocol: Some(vec!["dns".to_string()]),
                action: Some(RuleAction::HijackDns),
                ..Default::default()
            },
            RoutingRule::clash_mode("direct", DIRECT),
            RoutingRule::clash_mode("global", GLOBAL),
        ]
    }

    /// 单条规则元组转换为路由规则
    fn routing_rule(tuple: &RuleTuple, names: &dyn NameResolver) -> RoutingRule {
        let site_refs = tuple
            .site_rules
            .iter()
            .filter(|site| !site.trim().is_empty())
            .cloned();
        let ip_refs = tuple
            .ip_rules
            .iter()
            .filter(|ip| !ip.trim().is_empty())
            .map(|ip| format!("{}{}", ip.trim(), IP_RULE_SET_SUFFIX));

        // 广告拦截使用 reject 动作，其余指向出站
        let (outbound, action) = match &tuple.target {
            RuleTarget::Category(name) if name == AD_BLOCK => (None, Some(RuleAction::Reject)),
            RuleTarget::Category(name) => (Some(names.resolve(name)), None),
            RuleTarget::Custom(name) => (Some(name.clone()), None),
        };

        RoutingRule {
            rule_set: site_refs.chain(ip_refs).collect(),
            domain_suffix: tuple.domain_suffix.clone(),
            domain_keyword: tuple.domain_keyword.clone(),
            ip_cidr: tuple.ip_cidr.clone(),
            protocol: tuple.protocol.clone(),
            clash_mode: None,
            outbound,
            action,
        }
    }
}
