//! 基础模板
//! 模板为不可变值，每次编译深拷贝一份作为文档起点

use std::sync::Arc;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{BuilderError, BuilderResult};

/// 内置 sing-box 基础模板
static BUILTIN_TEMPLATE: Lazy<Result<BaseTemplate, String>> = Lazy::new(|| {
    BaseTemplate::from_json(include_str!("../../assets/singbox_base.json")).map_err(|e| e.to_string())
});

/// 不可变基础模板
#[derive(Debug, Clone, PartialEq)]
pub struct BaseTemplate {
    value: Arc<Value>,
}

impl BaseTemplate {
    /// 内置模板（共享同一份只读数据）
    pub fn builtin() -> BuilderResult<Self> {
        BUILTIN_TEMPLATE
            .as_ref()
            .cloned()
            .map_err(|e| BuilderError::TemplateError(e.clone()))
    }

    pub fn from_json(raw: &str) -> BuilderResult<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: Value) -> BuilderResult<Self> {
        if !value.is_object() {
            return Err(BuilderError::TemplateError("模板根节点必须是对象".to_string()));
        }
        Ok(Self {
            value: Arc::new(value),
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// 模板是否声明了 DNS 服务器
    pub fn declares_dns_servers(&self) -> bool {
        self.value
            .get("dns")
            .and_then(|dns| dns.get("servers"))
            .and_then(Value::as_array)
            .is_some_and(|servers| !servers.is_empty())
    }
}
