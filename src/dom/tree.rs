//! 轻量DOM树：基于下标的节点池，节点 0 固定为文档根
//! 移除节点只断开父子关系，不回收槽位

use super::Element;

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// 节点池大小（含已摘除的节点）
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// 追加元素节点
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push_node(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    /// 追加文本节点，与相邻文本节点合并
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some(&last) = self.nodes[parent].children.last() {
            if let NodeData::Text(existing) = &mut self.nodes[last].data {
                existing.push_str(text);
                return;
            }
        }

        self.push_node(parent, NodeData::Text(text.to_string()));
    }

    /// 将节点从父节点上摘除
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };

        self.nodes[parent].children.retain(|&child| child != id);
        self.nodes[id].parent = None;
    }

    /// 用单个文本节点替换全部子节点
    /// 已有唯一文本子节点时原地改写，反复改写不增加节点
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let &[only] = self.nodes[id].children.as_slice() {
            if let NodeData::Text(existing) = &mut self.nodes[only].data {
                if !text.is_empty() {
                    existing.clear();
                    existing.push_str(text);
                    return;
                }
            }
        }

        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children {
            self.nodes[child].parent = None;
        }
        self.append_text(id, text);
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// 子树内所有文本拼接（不做空白处理）
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if let NodeData::Text(t) = &node.data {
                text.push_str(t);
            }
            stack.extend(node.children.iter().rev());
        }
        text
    }

    /// 按文档顺序遍历根可达的所有元素
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![ROOT];
        std::iter::from_fn(move || {
            while let Some(current) = stack.pop() {
                let node = &self.nodes[current];
                stack.extend(node.children.iter().rev());
                if matches!(node.data, NodeData::Element { .. }) {
                    return Some(current);
                }
            }
            None
        })
    }

    pub fn find_element(&self, mut predicate: impl FnMut(NodeId) -> bool) -> Option<NodeId> {
        self.elements().find(|&id| predicate(id))
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find_element(|id| self.tag(id) == Some(tag))
    }

    /// 查找指定标签，缺失时在 `parent_tag`（或根节点）下创建
    pub fn ensure_element(&mut self, tag: &str, parent_tag: &str) -> NodeId {
        if let Some(id) = self.first_by_tag(tag) {
            return id;
        }

        let parent = self.first_by_tag(parent_tag).unwrap_or(ROOT);
        self.append_element(parent, tag, Vec::new())
    }

    /// 生成元素快照
    pub fn snapshot(&self, id: NodeId) -> Option<Element> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { tag, attrs } => {
                Some(Element::new(tag.clone(), attrs.clone(), self.text_content(id)))
            }
            _ => None,
        }
    }

    fn push_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }
}
