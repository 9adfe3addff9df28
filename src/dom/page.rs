//! 默认页面文档实现：html5ever解析得到的DOM树 + 标题观察者
//! 句柄可克隆，所有克隆共享同一份文档

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::parser::TreeBuilder;
use super::selector::Selector;
use super::tree::{DomTree, ROOT};
use super::{Document, Element, TitleNotifier, TitleObserver};
use crate::error::RulinameResult;
use crate::utils::{TextNormalizer, preview_compact};

#[derive(Debug, Clone, Default)]
pub struct PageDocument {
    tree: Arc<RwLock<DomTree>>,
    observers: Arc<Mutex<Vec<TitleNotifier>>>,
}

impl PageDocument {
    /// 从HTML文本创建页面
    pub fn parse(html: &str) -> Self {
        Self {
            tree: Arc::new(RwLock::new(TreeBuilder::parse_document(html))),
            observers: Arc::default(),
        }
    }

    /// 在 `<body>`（缺失时为文档根）末尾追加HTML片段，模拟页面内容延迟加载
    pub fn append_to_body(&self, html: &str) {
        let mut tree = self.write();
        let parent = tree.first_by_tag("body").unwrap_or(ROOT);
        let current = std::mem::take(&mut *tree);
        *tree = TreeBuilder::parse_fragment(current, parent, html);
    }

    /// 移除指定 id 的元素，返回是否存在
    pub fn remove_by_id(&self, id: &str) -> bool {
        let mut tree = self.write();
        let found = tree.find_element(|node| tree.attr(node, "id") == Some(id));
        match found {
            Some(node) => {
                tree.detach(node);
                true
            }
            None => false,
        }
    }

    /// 节点池大小
    pub fn node_count(&self) -> usize {
        self.read().len()
    }

    /// 当前仍在观察标题的观察者数量
    pub fn observer_count(&self) -> usize {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|tx| !tx.is_closed());
        observers.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, DomTree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DomTree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_title(&self, title: &str) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|tx| tx.send(title.to_string()).is_ok());
    }
}

impl Document for PageDocument {
    fn element_by_id(&self, id: &str) -> Option<Element> {
        let tree = self.read();
        let node = tree.find_element(|node| tree.attr(node, "id") == Some(id))?;
        tree.snapshot(node)
    }

    fn element_by_class_attr(&self, class: &str) -> Option<Element> {
        let tree = self.read();
        let node = tree.find_element(|node| tree.attr(node, "class") == Some(class))?;
        tree.snapshot(node)
    }

    fn query_selector(&self, selector: &str) -> RulinameResult<Option<Element>> {
        let selector = Selector::parse(selector)?;
        let tree = self.read();
        Ok(selector.query_first(&tree).and_then(|node| tree.snapshot(node)))
    }

    fn title(&self) -> String {
        let tree = self.read();
        tree.first_by_tag("title")
            .map(|node| TextNormalizer::collapse_whitespace(&tree.text_content(node)))
            .unwrap_or_default()
    }

    fn set_title(&self, title: &str) {
        {
            let mut tree = self.write();
            let node = tree.ensure_element("title", "head");
            tree.set_text(node, title);
        }
        debug!("页面标题已改写：{}", preview_compact(title, 80));
        self.notify_title(title);
    }

    fn observe_title(&self) -> TitleObserver {
        let (tx, observer) = TitleObserver::channel();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        observer
    }
}
