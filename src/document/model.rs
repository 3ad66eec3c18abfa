//! 输出文档中的出站分组与路由规则模型

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::proxy::ProxyDescriptor;
use crate::config::UrlTestOptions;
use crate::rule::RuleSetRef;

/// 直连哨兵
pub const DIRECT: &str = "DIRECT";
/// 拦截哨兵
pub const REJECT: &str = "REJECT";
/// 全局哨兵
pub const GLOBAL: &str = "GLOBAL";

/// 分组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Selector,
    UrlTest,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Selector => "selector",
            GroupKind::UrlTest => "urltest",
        }
    }
}

/// 分组成员
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// 固定引用：节点标签、分组标签或哨兵
    Tag(String),
    /// 实时引用文档中的全部节点，渲染时展开
    AllProxies,
}

impl Member {
    pub fn tag(tag: impl Into<String>) -> Self {
        Member::Tag(tag.into())
    }
}

/// 出站分组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundGroup {
    pub kind: GroupKind,
    pub tag: String,
    pub members: Vec<Member>,
    pub url_test: UrlTestOptions,
}

impl OutboundGroup {
    pub fn selector(tag: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            kind: GroupKind::Selector,
            tag: tag.into(),
            members,
            url_test: UrlTestOptions::default(),
        }
    }

    pub fn url_test(tag: impl Into<String>, members: Vec<Member>, options: UrlTestOptions) -> Self {
        Self {
            kind: GroupKind::UrlTest,
            tag: tag.into(),
            members,
            url_test: options,
        }
    }

    /// 按当前节点列表展开成员
    pub fn resolve_members(&self, proxy_tags: &[String]) -> Vec<String> {
        let mut resolved = Vec::with_capacity(self.members.len() + proxy_tags.len());
        for member in &self.members {
            match member {
                Member::Tag(tag) => resolved.push(tag.clone()),
                Member::AllProxies => resolved.extend(proxy_tags.iter().cloned()),
            }
        }
        resolved
    }

    pub fn to_value(&self, proxy_tags: &[String]) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!(self.kind.as_str()));
        obj.insert("tag".to_string(), json!(self.tag));
        obj.insert("outbounds".to_string(), json!(self.resolve_members(proxy_tags)));
        if self.kind == GroupKind::UrlTest {
            if let Some(url) = &self.url_test.url {
                obj.insert("url".to_string(), json!(url));
            }
            if let Some(interval) = &self.url_test.interval {
                obj.insert("interval".to_string(), json!(interval));
            }
            if let Some(tolerance) = self.url_test.tolerance {
                obj.insert("tolerance".to_string(), json!(tolerance));
            }
        }
        Value::Object(obj)
    }
}

/// 出站条目：分组或节点
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEntry {
    Group(OutboundGroup),
    Node(ProxyDescriptor),
}

impl OutboundEntry {
    pub fn tag(&self) -> &str {
        match self {
            OutboundEntry::Group(group) => &group.tag,
            OutboundEntry::Node(node) => &node.tag,
        }
    }

    pub fn as_group(&self) -> Option<&OutboundGroup> {
        match self {
            OutboundEntry::Group(group) => Some(group),
            OutboundEntry::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&ProxyDescriptor> {
        match self {
            OutboundEntry::Node(node) => Some(node),
            OutboundEntry::Group(_) => None,
        }
    }
}

/// 路由动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleAction {
    Reject,
    Sniff,
    HijackDns,
}

/// 路由规则
/// outbound 与 action 二选一决定规则效果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_set: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_suffix: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_keyword: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_cidr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clash_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,
}

impl RoutingRule {
    pub fn action(action: RuleAction) -> Self {
        Self {
            action: Some(action),
            ..Default::default()
        }
    }

    pub fn clash_mode(mode: &str, outbound: &str) -> Self {
        Self {
            clash_mode: Some(mode.to_string()),
            outbound: Some(outbound.to_string()),
            ..Default::default()
        }
    }
}

/// 路由段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSection {
    #[serde(default)]
    pub rule_set: Vec<RuleSetRef>,
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_outbound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_detect_interface: Option<bool>,
    // 模板中其余字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
