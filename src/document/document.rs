//! 可变配置文档
//! 由基础模板播种，分组装配与路由编译依次写入，最终渲染为 JSON

use std::fmt;
use std::sync::Arc;
use serde_json::{Map, Value};
use tracing::debug;

use super::format::{OutboundFormat, SharedFormat, SingBoxFormat};
use super::model::{OutboundEntry, OutboundGroup, RouteSection};
use super::proxy::ProxyDescriptor;
use crate::error::{BuilderError, BuilderResult};

/// 配置文档
#[derive(Clone)]
pub struct ConfigDocument {
    // 模板根字段，保留原有键顺序；outbounds / route 渲染时替换
    root: Map<String, Value>,
    outbounds: Vec<OutboundEntry>,
    route: RouteSection,
    // 节点提取与命名的唯一来源，快照成员与实时成员都经由它展开
    format: SharedFormat,
}

impl fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("root", &self.root)
            .field("outbounds", &self.outbounds)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl ConfigDocument {
    /// 从模板值构建（深拷贝，模板本身不被修改）
    pub fn from_template(template: &Value) -> BuilderResult<Self> {
        let Value::Object(root) = template else {
            return Err(BuilderError::TemplateError("模板根节点必须是对象".to_string()));
        };
        let root = root.clone();

        // 1. 解析模板自带出站
        let outbounds = match root.get("outbounds") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    serde_json::from_value::<ProxyDescriptor>(item.clone())
                        .map(OutboundEntry::Node)
                        .map_err(|e| BuilderError::TemplateError(format!("模板出站无效：{}", e)))
                })
                .collect::<BuilderResult<Vec<_>>>()?,
            Some(_) => {
                return Err(BuilderError::TemplateError("模板 outbounds 必须是数组".to_string()));
            }
        };

        // 2. 解析路由段；rule_set / rules 由路由编译整体写入，模板中的内容丢弃
        let route = match root.get("route") {
            None | Some(Value::Null) => RouteSection::default(),
            Some(Value::Object(route)) => {
                let mut route = route.clone();
                if route.remove("rule_set").is_some() | route.remove("rules").is_some() {
                    debug!("模板路由段中的 rule_set/rules 将被覆盖");
                }
                serde_json::from_value(Value::Object(route))
                    .map_err(|e| BuilderError::TemplateError(format!("模板路由段无效：{}", e)))?
            }
            Some(_) => {
                return Err(BuilderError::TemplateError("模板 route 必须是对象".to_string()));
            }
        };

        Ok(Self {
            root,
            outbounds,
            route,
            format: Arc::new(SingBoxFormat),
        })
    }

    /// 替换目标格式（默认 sing-box）
    pub fn with_format(mut self, format: SharedFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> &dyn OutboundFormat {
        &*self.format
    }

    pub fn shared_format(&self) -> SharedFormat {
        Arc::clone(&self.format)
    }

    pub fn outbounds(&self) -> &[OutboundEntry] {
        &self.outbounds
    }

    /// 全部节点（含模板元出站）
    pub fn nodes(&self) -> impl Iterator<Item = &ProxyDescriptor> {
        self.outbounds.iter().filter_map(OutboundEntry::as_node)
    }

    /// 全部分组
    pub fn groups(&self) -> impl Iterator<Item = &OutboundGroup> {
        self.outbounds.iter().filter_map(OutboundEntry::as_group)
    }

    pub fn group(&self, tag: &str) -> Option<&OutboundGroup> {
        self.groups().find(|group| group.tag == tag)
    }

    /// 当前节点名列表，由目标格式提取（实时成员展开依据）
    pub fn proxy_tags(&self) -> Vec<String> {
        self.format.proxy_list(self)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.outbounds.iter().any(|entry| entry.tag() == tag)
    }

    /// 追加节点到末尾
    pub fn push_node(&mut self, node: ProxyDescriptor) {
        self.outbounds.push(OutboundEntry::Node(node));
    }

    /// 插入分组到最前
    pub fn unshift_group(&mut self, group: OutboundGroup) {
        self.outbounds.insert(0, OutboundEntry::Group(group));
    }

    /// 追加分组：分组始终位于节点之前，新分组排在已有分组之后
    pub fn push_group(&mut self, group: OutboundGroup) {
        let pos = self
            .outbounds
            .iter()
            .take_while(|entry| matches!(entry, OutboundEntry::Group(_)))
            .count();
        self.outbounds.insert(pos, OutboundEntry::Group(group));
    }

    pub fn route(&self) -> &RouteSection {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut RouteSection {
        &mut self.route
    }

    /// 模板字段（不含 outbounds / route 的最新状态）
    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// 将首个 DNS 服务器的 detour 指向给定出站；模板未声明 DNS 服务器时返回 false
    pub fn patch_dns_detour(&mut self, detour: &str) -> bool {
        let first_server = self
            .root
            .get_mut("dns")
            .and_then(|dns| dns.get_mut("servers"))
            .and_then(Value::as_array_mut)
            .and_then(|servers| servers.first_mut())
            .and_then(Value::as_object_mut);

        match first_server {
            Some(server) => {
                server.insert("detour".to_string(), Value::String(detour.to_string()));
                true
            }
            None => false,
        }
    }

    /// 渲染为最终 JSON
    pub fn to_value(&self) -> BuilderResult<Value> {
        let proxy_tags = self.proxy_tags();
        let outbounds = self
            .outbounds
            .iter()
            .map(|entry| match entry {
                OutboundEntry::Group(group) => Ok(group.to_value(&proxy_tags)),
                OutboundEntry::Node(node) => serde_json::to_value(node),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut root = self.root.clone();
        root.insert("outbounds".to_string(), Value::Array(outbounds));
        root.insert("route".to_string(), serde_json::to_value(&self.route)?);
        Ok(Value::Object(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Member, RoutingRule};
    use serde_json::json;

    fn template() -> Value {
        json!({
            "dns": {"servers": [{"tag": "a"}, {"tag": "b"}]},
            "outbounds": [{"type": "direct", "tag": "DIRECT"}],
            "route": {"rules": [{"outbound": "old"}], "final": "old"},
            "experimental": {}
        })
    }

    #[test]
    fn test_from_template_does_not_touch_template() {
        let tpl = template();
        let mut doc = ConfigDocument::from_template(&tpl).unwrap();
        assert!(doc.patch_dns_detour("Proxy"));
        doc.push_node(ProxyDescriptor::new("trojan", "P1").with_field("server", "p1.example.com"));
        assert_eq!(tpl, template());
        assert!(doc.route().rules.is_empty());
        assert_eq!(doc.route().final_outbound.as_deref(), Some("old"));
    }

    #[test]
    fn test_patch_dns_detour_first_server_only() {
        let mut doc = ConfigDocument::from_template(&template()).unwrap();
        assert!(doc.patch_dns_detour("Proxy"));
        let value = doc.to_value().unwrap();
        assert_eq!(value["dns"]["servers"][0]["detour"], json!("Proxy"));
        assert!(value["dns"]["servers"][1].get("detour").is_none());

        let mut bare = ConfigDocument::from_template(&json!({"outbounds": []})).unwrap();
        assert!(!bare.patch_dns_detour("Proxy"));
    }

    #[test]
    fn test_groups_stay_ahead_of_nodes() {
        let mut doc = ConfigDocument::from_template(&template()).unwrap();
        doc.push_node(ProxyDescriptor::new("trojan", "P1").with_field("server", "p1.example.com"));
        doc.push_group(OutboundGroup::selector("G1", vec![Member::AllProxies]));
        doc.unshift_group(OutboundGroup::selector("G0", vec![]));
        doc.push_group(OutboundGroup::selector("G2", vec![]));
        let tags: Vec<_> = doc.outbounds().iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["G0", "G1", "G2", "DIRECT", "P1"]);
        assert_eq!(doc.proxy_tags(), vec!["P1"]);
        assert!(doc.has_tag("DIRECT"));
        assert!(doc.group("G1").is_some());
    }

    #[test]
    fn test_render_keeps_root_key_order() {
        let mut doc = ConfigDocument::from_template(&template()).unwrap();
        doc.route_mut().rules.push(RoutingRule::clash_mode("direct", "DIRECT"));
        let value = doc.to_value().unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["dns", "outbounds", "route", "experimental"]);
        assert_eq!(value["route"]["rules"], json!([{"clash_mode": "direct", "outbound": "DIRECT"}]));
    }

    #[test]
    fn test_invalid_templates() {
        assert!(ConfigDocument::from_template(&json!([])).is_err());
        assert!(ConfigDocument::from_template(&json!({"outbounds": {}})).is_err());
        assert!(ConfigDocument::from_template(&json!({"route": []})).is_err());
    }
}
