//! 内置显示名称表

use std::collections::HashMap;
use once_cell::sync::Lazy;

use super::Locale;

static ZH_CN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Auto Select", "⚡ 自动选择"),
        ("Node Select", "🚀 节点选择"),
        ("Fall Back", "🐟 漏网之鱼"),
        ("Ad Block", "🛑 广告拦截"),
        ("AI Services", "💬 AI 服务"),
        ("Bilibili", "📺 哔哩哔哩"),
        ("Youtube", "📹 油管视频"),
        ("Google", "🔍 谷歌服务"),
        ("Private", "🏠 私有网络"),
        ("Location:CN", "🔒 国内服务"),
        ("Telegram", "📲 电报消息"),
        ("Github", "🐱 Github"),
        ("Microsoft", "Ⓜ️ 微软服务"),
        ("Apple", "🍏 苹果服务"),
        ("Social Media", "🌐 社交媒体"),
        ("Streaming", "🎬 流媒体"),
        ("Gaming", "🎮 游戏平台"),
        ("Education", "📚 教育资源"),
        ("Financial", "💰 金融服务"),
        ("Cloud Services", "☁️ 云服务"),
        ("Non-China", "🌐 非中国"),
    ])
});

static EN_US: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Auto Select", "⚡ Auto Select"),
        ("Node Select", "🚀 Node Select"),
        ("Fall Back", "🐟 Fall Back"),
        ("Ad Block", "🛑 Ad Block"),
        ("AI Services", "💬 AI Services"),
        ("Bilibili", "📺 Bilibili"),
        ("Youtube", "📹 Youtube"),
        ("Google", "🔍 Google"),
        ("Private", "🏠 Private Network"),
        ("Location:CN", "🔒 China Services"),
        ("Telegram", "📲 Telegram"),
        ("Github", "🐱 Github"),
        ("Microsoft", "Ⓜ️ Microsoft"),
        ("Apple", "🍏 Apple"),
        ("Social Media", "🌐 Social Media"),
        ("Streaming", "🎬 Streaming"),
        ("Gaming", "🎮 Gaming"),
        ("Education", "📚 Education"),
        ("Financial", "💰 Financial"),
        ("Cloud Services", "☁️ Cloud Services"),
        ("Non-China", "🌐 Non-China"),
    ])
});

pub(crate) fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    let table = match locale {
        Locale::ZhCn => &ZH_CN,
        Locale::EnUs => &EN_US,
    };
    table.get(key).copied()
}
