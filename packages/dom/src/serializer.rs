use crate::parser::{is_raw_text_element, is_void_element};
use crate::vdom::{Document, VNode};

struct Context {
    buffer: String,
}

impl Context {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_escaped_text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '&' => self.add("&amp;"),
                '<' => self.add("&lt;"),
                '>' => self.add("&gt;"),
                _ => self.buffer.push(c),
            }
        }
    }

    fn add_escaped_attr(&mut self, value: &str) {
        for c in value.chars() {
            match c {
                '&' => self.add("&amp;"),
                '"' => self.add("&quot;"),
                '<' => self.add("&lt;"),
                '>' => self.add("&gt;"),
                _ => self.buffer.push(c),
            }
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Serialize a whole document, doctype included
pub fn to_html(document: &Document) -> String {
    let mut ctx = Context::new();
    if let Some(doctype) = &document.doctype {
        ctx.add("<!DOCTYPE ");
        ctx.add(doctype);
        ctx.add(">");
    }
    for node in &document.nodes {
        compile_node(node, None, &mut ctx);
    }
    ctx.get_output()
}

/// Serialize a single node (outer HTML)
pub fn node_to_html(node: &VNode) -> String {
    let mut ctx = Context::new();
    compile_node(node, None, &mut ctx);
    ctx.get_output()
}

/// Serialize the children of a node (inner HTML)
pub fn inner_html(node: &VNode) -> String {
    let mut ctx = Context::new();
    for child in node.children() {
        compile_node(child, node.tag(), &mut ctx);
    }
    ctx.get_output()
}

fn compile_node(node: &VNode, parent_tag: Option<&str>, ctx: &mut Context) {
    match node {
        VNode::Element {
            tag,
            attributes,
            children,
        } => {
            ctx.add("<");
            ctx.add(tag);
            for (name, value) in attributes.iter() {
                ctx.add(" ");
                ctx.add(name);
                if !value.is_empty() {
                    ctx.add("=\"");
                    ctx.add_escaped_attr(value);
                    ctx.add("\"");
                }
            }
            ctx.add(">");

            if is_void_element(tag) {
                return;
            }

            for child in children {
                compile_node(child, Some(tag), ctx);
            }

            ctx.add("</");
            ctx.add(tag);
            ctx.add(">");
        }
        VNode::Text { content } => match parent_tag {
            // script/style bodies are not markup; textarea/title are escaped
            Some(tag) if is_raw_text_element(tag) && tag != "textarea" && tag != "title" => {
                ctx.add(content)
            }
            _ => ctx.add_escaped_text(content),
        },
        VNode::Comment { content } => {
            ctx.add("<!--");
            ctx.add(content);
            ctx.add("-->");
        }
    }
}
