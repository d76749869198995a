use serde::{Deserialize, Serialize};

/// Index path from the document roots down to a node
pub type NodePath = Vec<usize>;

/// Element attributes in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.set(key, value);
        }
        attributes
    }
}

/// Virtual DOM node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VNode {
    /// HTML element
    Element {
        tag: String,
        attributes: Attributes,
        children: Vec<VNode>,
    },

    /// Text node
    Text { content: String },

    /// Comment node
    Comment { content: String },
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        VNode::Comment {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: VNode) -> Self {
        if let VNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<VNode>) -> Self {
        if let VNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub fn is_element(&self) -> bool {
        matches!(self, VNode::Element { .. })
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn is_tag(&self, name: &str) -> bool {
        self.tag().is_some_and(|tag| tag.eq_ignore_ascii_case(name))
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            VNode::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes().and_then(|attributes| attributes.get(name))
    }

    /// Set an attribute; no-op on non-element nodes
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let VNode::Element { attributes, .. } = self {
            attributes.set(key, value);
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<VNode>> {
        match self {
            VNode::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Replace all children; no-op on non-element nodes
    pub fn set_children(&mut self, new_children: Vec<VNode>) {
        if let Some(children) = self.children_mut() {
            *children = new_children;
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Append a class unless it is already present
    pub fn add_class(&mut self, class: &str) {
        if !self.is_element() || self.has_class(class) {
            return;
        }
        let value = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", value);
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Path (relative to this node) of the first descendant matching `predicate`
    pub fn find_descendant<F>(&self, predicate: F) -> Option<NodePath>
    where
        F: Fn(&VNode) -> bool,
    {
        fn visit<F: Fn(&VNode) -> bool>(node: &VNode, path: &mut NodePath, predicate: &F) -> bool {
            for (index, child) in node.children().iter().enumerate() {
                path.push(index);
                if predicate(child) || visit(child, path, predicate) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        visit(self, &mut path, &predicate).then_some(path)
    }

    pub fn descendant(&self, path: &[usize]) -> Option<&VNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children().get(index))
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut VNode> {
        let mut node = self;
        for &index in path {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }
}

fn collect_text(node: &VNode, out: &mut String) {
    match node {
        VNode::Text { content } => out.push_str(content),
        VNode::Element { children, .. } => {
            for child in children {
                collect_text(child, out);
            }
        }
        VNode::Comment { .. } => {}
    }
}

/// Parsed page: optional doctype plus root nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    pub nodes: Vec<VNode>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: VNode) {
        self.nodes.push(node);
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&VNode> {
        let (first, rest) = path.split_first()?;
        self.nodes.get(*first)?.descendant(rest)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut VNode> {
        let (first, rest) = path.split_first()?;
        self.nodes.get_mut(*first)?.descendant_mut(rest)
    }

    /// Visit every element in document order with its path and ancestor chain
    pub fn walk_elements<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(&NodePath, &'a VNode, &[&'a VNode]),
    {
        fn visit<'a, F>(
            nodes: &'a [VNode],
            path: &mut NodePath,
            ancestors: &mut Vec<&'a VNode>,
            visitor: &mut F,
        ) where
            F: FnMut(&NodePath, &'a VNode, &[&'a VNode]),
        {
            for (index, node) in nodes.iter().enumerate() {
                if !node.is_element() {
                    continue;
                }
                path.push(index);
                visitor(path, node, ancestors);
                ancestors.push(node);
                visit(node.children(), path, ancestors, visitor);
                ancestors.pop();
                path.pop();
            }
        }

        let mut path = Vec::new();
        let mut ancestors = Vec::new();
        visit(&self.nodes, &mut path, &mut ancestors, &mut visitor);
    }

    /// Paths of all elements carrying `name`, in document order
    pub fn elements_with_attr(&self, name: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        self.walk_elements(|path, node, _| {
            if node.attr(name).is_some() {
                found.push(path.clone());
            }
        });
        found
    }

    /// First element with the given tag name
    pub fn find_tag(&self, tag: &str) -> Option<NodePath> {
        let mut found = None;
        self.walk_elements(|path, node, _| {
            if found.is_none() && node.is_tag(tag) {
                found = Some(path.clone());
            }
        });
        found
    }
}
