//! 文档模块：输出配置文档的数据模型、基础模板与目标格式能力
pub mod proxy;
pub mod model;
pub mod document;
pub mod template;
pub mod format;
pub mod assembler;

// 导出核心接口
pub use self::proxy::ProxyDescriptor;
pub use self::model::{
    GroupKind, Member, OutboundEntry, OutboundGroup, RouteSection, RoutingRule, RuleAction,
    DIRECT, GLOBAL, REJECT,
};
pub use self::document::ConfigDocument;
pub use self::template::BaseTemplate;
pub use self::format::{OutboundFormat, SharedFormat, SingBoxFormat};
pub use self::assembler::DocumentAssembler;
