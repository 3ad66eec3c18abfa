//! 文档装配：播种、节点写入、收尾

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::document::ConfigDocument;
use super::format::SharedFormat;
use super::proxy::ProxyDescriptor;
use super::template::BaseTemplate;
use crate::error::BuilderResult;
use crate::i18n::{NameResolver, NODE_SELECT};

/// 文档装配器
pub struct DocumentAssembler;

impl DocumentAssembler {
    /// 深拷贝模板、绑定目标格式，并将 DNS detour 指向节点选择组
    pub fn seed(
        template: &BaseTemplate,
        format: SharedFormat,
        names: &dyn NameResolver,
    ) -> BuilderResult<ConfigDocument> {
        let mut document = ConfigDocument::from_template(template.value())?.with_format(format);
        if template.declares_dns_servers() {
            let node_select = names.resolve(NODE_SELECT);
            document.patch_dns_detour(&node_select);
            debug!("DNS detour 已指向 {}", node_select);
        }
        Ok(document)
    }

    /// 写入节点：丢弃无标签节点；与已有出站或保留标签重名时追加序号
    pub fn add_proxies(
        document: &mut ConfigDocument,
        proxies: &[ProxyDescriptor],
        reserved: &HashSet<String>,
    ) -> usize {
        let format = document.shared_format();
        let mut used: HashSet<String> = document
            .outbounds()
            .iter()
            .map(|entry| entry.tag().to_string())
            .chain(reserved.iter().cloned())
            .collect();

        // 每个重名标签下一个待试的序号
        let mut next_suffix: HashMap<String, usize> = HashMap::new();
        let mut added = 0;
        for proxy in proxies {
            if proxy.tag.trim().is_empty() {
                warn!("丢弃无标签节点：type={}", proxy.kind);
                continue;
            }
            let Some(mut converted) = format.convert_proxy(proxy) else {
                debug!("节点 {} 转换后被丢弃", proxy.tag);
                continue;
            };
            let unique = Self::unique_tag(&used, &mut next_suffix, &converted.tag);
            if unique != converted.tag {
                warn!("节点标签重复：{} 重命名为 {}", converted.tag, unique);
                converted.tag = unique;
            }
            used.insert(converted.tag.clone());
            format.add_proxy(document, converted);
            added += 1;
        }
        added
    }

    fn unique_tag(used: &HashSet<String>, next_suffix: &mut HashMap<String, usize>, tag: &str) -> String {
        if !used.contains(tag) {
            return tag.to_string();
        }
        let n = next_suffix.entry(tag.to_string()).or_insert(2);
        loop {
            let candidate = format!("{} {}", tag, n);
            *n += 1;
            if !used.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// 收尾：不做目标格式校验，原样交还调用方
    pub fn finalize(document: ConfigDocument) -> ConfigDocument {
        debug!(
            "配置文档装配完成：出站{}个、路由规则{}条、规则集{}个",
            document.outbounds().len(),
            document.route().rules.len(),
            document.route().rule_set.len()
        );
        document
    }
}
