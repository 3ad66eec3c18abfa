//! 节点描述
//! 上游已规整为 sing-box 出站形态，编译器只读取标签与是否为真实服务器

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 单个出站节点（或模板中的直连/拦截等元出站）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tag: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProxyDescriptor {
    pub fn new(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            tag: tag.into(),
            fields: Map::new(),
        }
    }

    /// 追加字段（链式）
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 是否为真实服务器节点（带 server 字段）
    pub fn is_server(&self) -> bool {
        self.fields.get("server").is_some_and(|v| !v.is_null())
    }
}
