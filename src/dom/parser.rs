//! HTML解析器
//! 基于html5ever分词器构建轻量DOM树（不做完整的HTML树构建算法）

use std::cell::RefCell;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

use super::tree::{DomTree, NodeId, ROOT};

/// 无结束标签的空元素
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
pub struct TreeBuilder {
    tree: RefCell<DomTree>,
    open: RefCell<Vec<NodeId>>,
}

impl TokenSink for TreeBuilder {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag { kind: TagKind::StartTag, name, self_closing, attrs }) => {
                return self.start_tag(name.as_ref(), self_closing, &attrs);
            }
            Token::TagToken(Tag { kind: TagKind::EndTag, name, .. }) => {
                self.end_tag(name.as_ref());
            }
            Token::CharacterTokens(text) => {
                let parent = self.current();
                self.tree.borrow_mut().append_text(parent, &text);
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl TreeBuilder {
    /// 在已有树的 `parent` 节点下继续构建
    pub fn new(tree: DomTree, parent: NodeId) -> Self {
        Self {
            tree: RefCell::new(tree),
            open: RefCell::new(vec![parent]),
        }
    }

    /// 解析完整文档
    pub fn parse_document(html: &str) -> DomTree {
        Self::new(DomTree::new(), ROOT).feed(html)
    }

    /// 解析HTML片段并挂到 `parent` 下
    pub fn parse_fragment(tree: DomTree, parent: NodeId, html: &str) -> DomTree {
        Self::new(tree, parent).feed(html)
    }

    fn feed(self, html: &str) -> DomTree {
        let tokenizer = Tokenizer::new(self, TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.tree.into_inner()
    }

    fn current(&self) -> NodeId {
        self.open.borrow().last().copied().unwrap_or(ROOT)
    }

    fn start_tag(&self, name: &str, self_closing: bool, attrs: &[Attribute]) -> TokenSinkResult<()> {
        let attrs = attrs
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();

        let parent = self.current();
        let id = self.tree.borrow_mut().append_element(parent, name, attrs);

        if self_closing || VOID_ELEMENTS.contains(&name) {
            return TokenSinkResult::Continue;
        }
        self.open.borrow_mut().push(id);

        // 文本类元素需要切换分词状态，否则内容会被当作标签解析
        match name {
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "style" | "xmp" | "noframes" => TokenSinkResult::RawData(RawKind::Rawtext),
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            _ => TokenSinkResult::Continue,
        }
    }

    fn end_tag(&self, name: &str) {
        let tree = self.tree.borrow();
        let mut open = self.open.borrow_mut();

        // 第一个槽位是构建起点，不允许弹出
        let Some(pos) = open.iter().skip(1).rposition(|&id| tree.tag(id) == Some(name)) else {
            return;
        };
        open.truncate(pos + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let html = r#"
            <!DOCTYPE html>
            <html><head><title>Old Title</title></head>
            <body>
                <div id="main" class="content wide"><h1>Hello <b>there</b></h1><br><img src="x.png"></div>
                <script>if (a < b) { document.title = "<b>"; }</script>
            </body></html>
        "#;

        let tree = TreeBuilder::parse_document(html);
        let title = tree.first_by_tag("title").unwrap();
        assert_eq!(tree.text_content(title), "Old Title");

        let main = tree.find_element(|id| tree.attr(id, "id") == Some("main")).unwrap();
        assert_eq!(tree.attr(main, "class"), Some("content wide"));
        assert_eq!(tree.text_content(main), "Hello there");

        // 空元素不会吞掉后续兄弟节点
        let img = tree.first_by_tag("img").unwrap();
        assert_eq!(tree.parent(img), Some(main));

        // script 内容按原始文本处理
        let script = tree.first_by_tag("script").unwrap();
        assert!(tree.text_content(script).contains("a < b"));
        assert!(tree.first_by_tag("b").is_some_and(|b| tree.parent(b) != Some(script)));
    }

    #[test]
    fn test_unmatched_end_tag_is_ignored() {
        let tree = TreeBuilder::parse_document("<div><span>x</p></span><em>y</em></div>");
        let div = tree.first_by_tag("div").unwrap();
        let em = tree.first_by_tag("em").unwrap();
        assert_eq!(tree.parent(em), Some(div));
    }

    #[test]
    fn test_parse_fragment() {
        let tree = TreeBuilder::parse_document("<html><body></body></html>");
        let body = tree.first_by_tag("body").unwrap();

        let tree = TreeBuilder::parse_fragment(tree, body, "<p id=\"late\">Late</p></body><i>z</i>");
        let p = tree.find_element(|id| tree.attr(id, "id") == Some("late")).unwrap();
        assert_eq!(tree.parent(p), Some(body));

        // 片段中多余的结束标签不能越过挂载点
        let i = tree.first_by_tag("i").unwrap();
        assert_eq!(tree.parent(i), Some(body));
    }
}
