//! 规则模块：规则数据模型与分类目录解析
pub mod model;
pub mod catalog;

// 导出核心接口
pub use self::model::{
    CustomRule, Preset, ResolvedRules, RuleSelection, RuleSetFormat, RuleSetKind, RuleSetRef,
    RuleTarget, RuleTuple,
};
pub use self::catalog::{
    find_category, CategoryDef, PredefinedCatalog, RuleCatalog, AD_BLOCK, IP_RULE_SET_SUFFIX,
    UNIFIED_RULES,
};
