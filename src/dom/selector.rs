//! 简单CSS选择器
//! 支持：类型、`*`、`#id`、`.class`、`[attr]`、`[attr=value]`、复合选择器、
//! 后代（空格）与子代（`>`）组合符、逗号分隔的选择器列表

use super::tree::{DomTree, NodeId};
use crate::error::{RulinameError, RulinameResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrSelector {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(tag) = tree.tag(node) else {
            return false;
        };

        if self.tag.as_deref().is_some_and(|expected| expected != tag) {
            return false;
        }

        if self.id.as_deref().is_some_and(|id| tree.attr(node, "id") != Some(id)) {
            return false;
        }

        if !self.classes.is_empty() {
            let class_attr = tree.attr(node, "class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|c| class_attr.split_ascii_whitespace().any(|have| have == c))
            {
                return false;
            }
        }

        self.attrs.iter().all(|attr| match attr {
            AttrSelector::Exists(name) => tree.attr(node, name).is_some(),
            AttrSelector::Equals(name, value) => tree.attr(node, name) == Some(value.as_str()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// 复杂选择器：`(组合符, 复合选择器)` 序列，首项的组合符无意义
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.matches_at(tree, node, self.parts.len() - 1)
    }

    // 从右向左匹配，后代组合符需要回溯所有祖先
    fn matches_at(&self, tree: &DomTree, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.matches_at(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = tree.parent(node);
                while let Some(current) = ancestor {
                    if self.matches_at(tree, current, index - 1) {
                        return true;
                    }
                    ancestor = tree.parent(current);
                }
                false
            }
        }
    }
}

/// 解析后的选择器列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(selector: &str) -> RulinameResult<Self> {
        Parser::new(selector).parse()
    }

    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.alternatives.iter().any(|complex| complex.matches(tree, node))
    }

    /// 文档顺序下的第一个命中元素
    pub fn query_first(&self, tree: &DomTree) -> Option<NodeId> {
        tree.find_element(|id| self.matches(tree, id))
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
        }
    }

    fn error(&self) -> RulinameError {
        RulinameError::InvalidSelector(self.source.to_string())
    }

    fn parse(mut self) -> RulinameResult<Selector> {
        let mut alternatives = Vec::new();
        let mut parts: Vec<(Combinator, Compound)> = Vec::new();
        let mut compound = Compound::default();
        let mut pending: Option<Combinator> = None;

        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    if !compound.is_empty() {
                        parts.push((pending.take().unwrap_or(Combinator::Descendant), compound));
                        compound = Compound::default();
                        pending = Some(Combinator::Descendant);
                    }
                }
                '>' => {
                    self.chars.next();
                    if !compound.is_empty() {
                        parts.push((pending.take().unwrap_or(Combinator::Descendant), compound));
                        compound = Compound::default();
                    } else if parts.is_empty() || pending == Some(Combinator::Child) {
                        return Err(self.error());
                    }
                    pending = Some(Combinator::Child);
                }
                ',' => {
                    self.chars.next();
                    if !compound.is_empty() {
                        parts.push((pending.take().unwrap_or(Combinator::Descendant), compound));
                        compound = Compound::default();
                    }
                    if parts.is_empty() || pending == Some(Combinator::Child) {
                        return Err(self.error());
                    }
                    alternatives.push(Complex { parts: std::mem::take(&mut parts) });
                    pending = None;
                }
                '#' => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                '.' => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.chars.next();
                    compound.attrs.push(self.attribute()?);
                }
                '*' => {
                    self.chars.next();
                    if compound.universal || compound.tag.is_some() {
                        return Err(self.error());
                    }
                    compound.universal = true;
                }
                c if is_ident_char(c) => {
                    if !compound.is_empty() {
                        return Err(self.error());
                    }
                    compound.tag = Some(self.ident()?.to_ascii_lowercase());
                }
                _ => return Err(self.error()),
            }
        }

        if !compound.is_empty() {
            parts.push((pending.take().unwrap_or(Combinator::Descendant), compound));
        } else if pending == Some(Combinator::Child) {
            return Err(self.error());
        }

        if parts.is_empty() {
            return Err(self.error());
        }
        alternatives.push(Complex { parts });

        Ok(Selector { alternatives })
    }

    fn ident(&mut self) -> RulinameResult<String> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            ident.push(c);
            self.chars.next();
        }

        if ident.is_empty() {
            return Err(self.error());
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> RulinameResult<AttrSelector> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        match self.chars.next() {
            Some(']') => Ok(AttrSelector::Exists(name)),
            Some('=') => {
                self.skip_whitespace();
                let value = match self.chars.peek() {
                    Some(&quote) if quote == '"' || quote == '\'' => {
                        self.chars.next();
                        let mut value = String::new();
                        loop {
                            match self.chars.next() {
                                Some(c) if c == quote => break,
                                Some(c) => value.push(c),
                                None => return Err(self.error()),
                            }
                        }
                        value
                    }
                    _ => self.ident()?,
                };
                self.skip_whitespace();
                match self.chars.next() {
                    Some(']') => Ok(AttrSelector::Equals(name, value)),
                    _ => Err(self.error()),
                }
            }
            _ => Err(self.error()),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
