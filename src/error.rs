//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum BuilderError {
    // 规则相关错误
    #[error("未知的规则分类：{0}")]
    UnknownCategory(String),
    #[error("未知的预设规则集：{0}")]
    UnknownPreset(String),
    #[error("自定义规则无效：{0}")]
    InvalidCustomRule(String),
    #[error("规则引用了未声明的规则集：{0}")]
    UndeclaredRuleSet(String),

    // 模板相关错误
    #[error("基础模板无效：{0}")]
    TemplateError(String),

    // 编译相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type BuilderResult<T> = Result<T, BuilderError>;
