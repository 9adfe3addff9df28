//! 页面文档模块：标题解析器所依赖的DOM抽象与默认实现
pub mod tree;
pub mod parser;
pub mod selector;
pub mod page;

use tokio::sync::mpsc;

use crate::error::RulinameResult;
use crate::utils::TextNormalizer;

// 导出核心接口
pub use self::page::PageDocument;
pub use self::parser::TreeBuilder;
pub use self::selector::Selector;
pub use self::tree::{DomTree, NodeId};

/// 元素快照（查找结果，不随页面后续变化而更新）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
}

impl Element {
    pub fn new(tag: String, attrs: Vec<(String, String)>, text: String) -> Self {
        Self { tag, attrs, text }
    }

    /// 合成一个只包含文本的容器元素（固定标题使用，不查询页面）
    pub fn container(text: impl Into<String>) -> Self {
        Self::new("div".to_string(), Vec::new(), text.into())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn class(&self) -> Option<&str> {
        self.attr("class")
    }

    /// 渲染文本：子树文本折叠空白后的结果
    pub fn text_content(&self) -> String {
        TextNormalizer::collapse_whitespace(&self.text)
    }
}

/// 标题变化观察者，每次标题节点被改写都会收到当时写入的标题
#[derive(Debug)]
pub struct TitleObserver {
    rx: mpsc::UnboundedReceiver<String>,
}

/// 标题变化通知端
pub type TitleNotifier = mpsc::UnboundedSender<String>;

impl TitleObserver {
    pub fn channel() -> (TitleNotifier, TitleObserver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, TitleObserver { rx })
    }

    /// 等待下一次标题变化，文档销毁后返回 `None`
    pub async fn changed(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// 标题解析器运行所需的页面能力
pub trait Document: Clone + Send + Sync + 'static {
    /// 按 id 属性查找
    fn element_by_id(&self, id: &str) -> Option<Element>;

    /// 按 class 属性字面值精确查找（不是 class 列表包含）
    fn element_by_class_attr(&self, class: &str) -> Option<Element>;

    /// 按选择器查找，选择器非法时报错
    fn query_selector(&self, selector: &str) -> RulinameResult<Option<Element>>;

    fn title(&self) -> String;

    fn set_title(&self, title: &str);

    /// 安装标题观察者，观察者被丢弃即停止观察
    fn observe_title(&self) -> TitleObserver;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_accessors() {
        let element = Element::new(
            "h1".to_string(),
            vec![("ID".to_string(), "main".to_string()), ("class".to_string(), "big title".to_string())],
            "\n  Breaking   news \n".to_string(),
        );
        assert_eq!(element.tag(), "h1");
        assert_eq!(element.id(), Some("main"));
        assert_eq!(element.class(), Some("big title"));
        assert_eq!(element.text_content(), "Breaking news");

        let fixed = Element::container("FixedTitle");
        assert_eq!(fixed.text_content(), "FixedTitle");
        assert_eq!(fixed.id(), None);
    }
}
