//! 出站分组装配
//! 依固定顺序写入：自动选择、节点选择、分类分组、自定义规则分组、漏网之鱼

use std::collections::HashSet;
use tracing::debug;

use crate::config::{BuilderConfig, UrlTestOptions};
use crate::document::{ConfigDocument, Member, OutboundGroup, DIRECT, GLOBAL, REJECT};
use crate::error::{BuilderError, BuilderResult};
use crate::i18n::{NameResolver, AUTO_SELECT, FALL_BACK, NODE_SELECT};
use crate::rule::{CustomRule, AD_BLOCK, UNIFIED_RULES};

/// 分组装配器
pub struct GroupAssembler;

impl GroupAssembler {
    /// 装配全部分组
    pub fn assemble(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        config: &BuilderConfig,
        categories: &[String],
        custom_rules: &[CustomRule],
    ) {
        let proxy_list = document.proxy_tags();

        Self::add_auto_select_group(document, names, &proxy_list, &config.url_test);
        Self::add_node_select_group(document, names);
        Self::add_outbound_groups(document, names, config, categories, &proxy_list);
        Self::add_custom_rule_groups(document, names, custom_rules, &proxy_list);
        Self::add_fallback_group(document, names, &proxy_list);

        debug!(
            "分组装配完成：节点{}个、分类分组{}个、自定义分组{}个",
            proxy_list.len(),
            categories.iter().filter(|c| c.as_str() != NODE_SELECT).count(),
            custom_rules.len()
        );
    }

    /// 即将写入的分组标签与哨兵，节点不得占用
    pub fn reserved_tags(
        names: &dyn NameResolver,
        categories: &[String],
        custom_rules: &[CustomRule],
    ) -> HashSet<String> {
        [NODE_SELECT, AUTO_SELECT, FALL_BACK]
            .iter()
            .map(|key| names.resolve(key))
            .chain(
                categories
                    .iter()
                    .filter(|c| c.as_str() != NODE_SELECT)
                    .map(|c| names.resolve(c)),
            )
            .chain(custom_rules.iter().map(|rule| rule.name.trim().to_string()))
            .chain([DIRECT, REJECT, GLOBAL].iter().map(|s| s.to_string()))
            .collect()
    }

    /// 自定义规则名不得与内置分组的显示名相同
    pub fn check_custom_names(
        names: &dyn NameResolver,
        categories: &[String],
        custom_rules: &[CustomRule],
    ) -> BuilderResult<()> {
        let builtin: HashSet<String> = [NODE_SELECT, AUTO_SELECT, FALL_BACK]
            .iter()
            .copied()
            .chain(UNIFIED_RULES.iter().map(|def| def.name))
            .chain(categories.iter().map(String::as_str))
            .map(|key| names.resolve(key))
            .collect();

        match custom_rules
            .iter()
            .map(|rule| rule.name.trim())
            .find(|name| builtin.contains(*name))
        {
            Some(name) => Err(BuilderError::InvalidCustomRule(format!(
                "规则名 {} 与内置分组显示名冲突",
                name
            ))),
            None => Ok(()),
        }
    }

    /// 逐个拷贝节点名
    fn copied(proxy_list: &[String]) -> impl Iterator<Item = Member> + '_ {
        proxy_list.iter().map(|tag| Member::Tag(tag.clone()))
    }

    /// 自动选择组：成员为节点名快照
    fn add_auto_select_group(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        proxy_list: &[String],
        options: &UrlTestOptions,
    ) {
        document.unshift_group(OutboundGroup::url_test(
            names.resolve(AUTO_SELECT),
            Self::copied(proxy_list).collect(),
            options.clone(),
        ));
    }

    /// 节点选择组：实时引用全部节点，排在最前
    fn add_node_select_group(document: &mut ConfigDocument, names: &dyn NameResolver) {
        document.unshift_group(OutboundGroup::selector(
            names.resolve(NODE_SELECT),
            vec![Member::AllProxies],
        ));
    }

    /// 分类分组：按调用方给出的顺序追加
    fn add_outbound_groups(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        config: &BuilderConfig,
        categories: &[String],
        proxy_list: &[String],
    ) {
        let node_select = names.resolve(NODE_SELECT);
        for category in categories.iter().filter(|c| c.as_str() != NODE_SELECT) {
            let members: Vec<Member> = if category == AD_BLOCK {
                vec![Member::tag(REJECT), Member::tag(DIRECT)]
            } else if config.prefers_direct(category) {
                std::iter::once(Member::tag(DIRECT))
                    .chain(Self::copied(proxy_list))
                    .collect()
            } else {
                std::iter::once(Member::tag(node_select.clone()))
                    .chain(Self::copied(proxy_list))
                    .chain(std::iter::once(Member::tag(DIRECT)))
                    .collect()
            };
            document.push_group(OutboundGroup::selector(names.resolve(category), members));
        }
    }

    /// 自定义规则分组：标签即规则名
    fn add_custom_rule_groups(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        custom_rules: &[CustomRule],
        proxy_list: &[String],
    ) {
        let node_select = names.resolve(NODE_SELECT);
        for rule in custom_rules {
            let members = std::iter::once(Member::tag(node_select.clone()))
                .chain(Self::copied(proxy_list))
                .collect();
            document.push_group(OutboundGroup::selector(rule.name.trim(), members));
        }
    }

    /// 漏网之鱼：路由兜底出站
    fn add_fallback_group(
        document: &mut ConfigDocument,
        names: &dyn NameResolver,
        proxy_list: &[String],
    ) {
        let members = std::iter::once(Member::tag(names.resolve(NODE_SELECT)))
            .chain(Self::copied(proxy_list))
            .collect();
        document.push_group(OutboundGroup::selector(names.resolve(FALL_BACK), members));
    }
}
