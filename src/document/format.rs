//! 目标格式能力
//! 分组与路由逻辑只依赖这四项能力：提取节点、读取节点名、转换节点、写入节点

use std::sync::Arc;

use super::document::ConfigDocument;
use super::proxy::ProxyDescriptor;

/// 文档与编译器共享的格式能力
pub type SharedFormat = Arc<dyn OutboundFormat + Send + Sync>;

/// 目标格式能力集
pub trait OutboundFormat {
    /// 从文档中提取真实节点
    fn proxies<'a>(&self, document: &'a ConfigDocument) -> Vec<&'a ProxyDescriptor>;

    /// 节点显示名
    fn proxy_name<'a>(&self, proxy: &'a ProxyDescriptor) -> &'a str;

    /// 转换为本格式形态，返回 None 表示丢弃
    fn convert_proxy(&self, proxy: &ProxyDescriptor) -> Option<ProxyDescriptor>;

    /// 写入文档
    fn add_proxy(&self, document: &mut ConfigDocument, proxy: ProxyDescriptor);

    /// 节点名列表（按文档顺序）
    fn proxy_list(&self, document: &ConfigDocument) -> Vec<String> {
        self.proxies(document)
            .into_iter()
            .map(|proxy| self.proxy_name(proxy).to_string())
            .collect()
    }
}

/// sing-box 格式：节点已是目标形态，直接透传
#[derive(Debug, Clone, Copy, Default)]
pub struct SingBoxFormat;

impl OutboundFormat for SingBoxFormat {
    fn proxies<'a>(&self, document: &'a ConfigDocument) -> Vec<&'a ProxyDescriptor> {
        document.nodes().filter(|node| node.is_server()).collect()
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
