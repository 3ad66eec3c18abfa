//! 列表处理工具
//! 逗号分隔字符串拆分、保序去重，以及“字符串或数组”两用的反序列化

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Deserializer};

/// 拆分逗号分隔字符串，去除首尾空白并丢弃空项
pub fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// 保序去重（保留首次出现）
pub fn dedup_ordered<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Str(String),
    List(Vec<String>),
}

/// 反序列化 `"a,b"` 或 `["a", "b"]` 为列表
pub fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrList>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(StringOrList::Str(s)) => split_comma_list(&s),
        Some(StringOrList::List(list)) => list
            .iter()
            .flat_map(|item| split_comma_list(item))
            .collect(),
    })
}
