//! singbox-builder - sing-box 客户端配置生成库
//!
//! 输入代理节点、规则选择与自定义规则，输出完整的 sing-box 配置文档：
//! 出站分组、路由规则、规则集声明与 DNS 出站均在一次编译中生成。

// 导出全局错误类型
pub use self::error::{BuilderError, BuilderResult};

// 导出配置模块
pub use self::config::{BuilderConfig, ConfigManager, CustomConfigBuilder, UrlTestOptions};

// 导出本地化模块
pub use self::i18n::{Locale, NameResolver};

// 导出规则模块核心接口
pub use self::rule::{
    CustomRule, PredefinedCatalog, Preset, ResolvedRules, RuleCatalog, RuleSelection, RuleSetRef,
};

// 导出文档模块核心接口
pub use self::document::{
    BaseTemplate, ConfigDocument, DocumentAssembler, OutboundFormat, ProxyDescriptor, SharedFormat,
    SingBoxFormat,
};

// 导出编译模块核心接口
pub use self::compiler::{CompileRequest, ConfigCompiler, GroupAssembler, RouteCompiler};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod i18n;
pub mod rule;
pub mod document;
pub mod utils;
pub mod compiler;
