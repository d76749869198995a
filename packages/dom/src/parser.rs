//! Lenient HTML parser producing the virtual DOM.
//!
//! Unclosed elements are closed at end of input and stray end tags are
//! dropped, so server-rendered pages always parse. Only truncated markup
//! (end of input inside a tag or comment) is an error.

use crate::error::{ParseError, ParseResult};
use crate::vdom::{Attributes, Document, VNode};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Opening one of these closes an open element of the same tag (`<li>a<li>b`)
const SIBLING_CLOSED_ELEMENTS: &[&str] = &["dd", "dt", "li", "option", "p", "td", "th", "tr"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Parse a complete page, keeping its doctype
pub fn parse_document(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source);
    let nodes = parser.parse_nodes()?;
    Ok(Document {
        doctype: parser.doctype,
        nodes,
    })
}

/// Parse a fragment (e.g. rich override content); a doctype is ignored
pub fn parse_fragment(source: &str) -> ParseResult<Vec<VNode>> {
    Parser::new(source).parse_nodes()
}

struct OpenElement {
    tag: String,
    attributes: Attributes,
    children: Vec<VNode>,
}

impl OpenElement {
    fn finish(self) -> VNode {
        VNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

struct Parser<'src> {
    source: &'src str,
    pos: usize,
    doctype: Option<String>,
    roots: Vec<VNode>,
    stack: Vec<OpenElement>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            doctype: None,
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn push_node(&mut self, node: VNode) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn parse_nodes(&mut self) -> ParseResult<Vec<VNode>> {
        while !self.is_at_end() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.parse_comment()?;
            } else if starts_with_ignore_case(rest, "<!doctype") {
                self.parse_doctype()?;
            } else if rest.starts_with("</") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.parse_end_tag()?;
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.parse_start_tag()?;
            } else {
                self.parse_text();
            }
        }

        while let Some(open) = self.stack.pop() {
            self.push_node(open.finish());
        }
        Ok(std::mem::take(&mut self.roots))
    }

    fn parse_text(&mut self) {
        // A lone `<` that does not open markup is literal text
        let skip = usize::from(self.rest().starts_with('<'));
        let len = self.rest()[skip..]
            .find('<')
            .map(|i| i + skip)
            .unwrap_or(self.rest().len());
        let raw = &self.rest()[..len];
        self.pos += len;
        self.push_node(VNode::text(decode_entities(raw)));
    }

    fn parse_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let body = &self.rest()[4..];
        let end = body
            .find("-->")
            .ok_or(ParseError::UnterminatedComment { pos: start })?;
        let content = body[..end].to_string();
        self.pos += 4 + end + 3;
        self.push_node(VNode::comment(content));
        Ok(())
    }

    fn parse_doctype(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let end = self
            .rest()
            .find('>')
            .ok_or(ParseError::unexpected_eof(start))?;
        let content = self.rest()["<!doctype".len()..end].trim().to_string();
        self.pos += end + 1;
        if self.doctype.is_none() {
            self.doctype = Some(content);
        }
        Ok(())
    }

    fn parse_end_tag(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let end = self
            .rest()
            .find('>')
            .ok_or(ParseError::unexpected_eof(start))?;
        let tag = self.rest()[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;

        if let Some(depth) = self.stack.iter().rposition(|open| open.tag == tag) {
            while self.stack.len() > depth {
                if let Some(open) = self.stack.pop() {
                    self.push_node(open.finish());
                }
            }
        }
        Ok(())
    }

    fn parse_start_tag(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/').to_ascii_lowercase();

        let mut attributes = Attributes::new();
        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::unexpected_eof(start));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let (name, value) = self.parse_attribute(start)?;
            if !attributes.contains(&name) {
                attributes.set(name, value);
            }
        };

        if SIBLING_CLOSED_ELEMENTS.contains(&tag.as_str())
            && self.stack.last().is_some_and(|open| open.tag == tag)
        {
            if let Some(open) = self.stack.pop() {
                self.push_node(open.finish());
            }
        }

        let open = OpenElement {
            tag,
            attributes,
            children: Vec::new(),
        };

        if self_closing || is_void_element(&open.tag) {
            self.push_node(open.finish());
        } else if is_raw_text_element(&open.tag) {
            let content = self.take_raw_text(&open.tag);
            let mut open = open;
            if !content.is_empty() {
                let content = if open.tag == "textarea" || open.tag == "title" {
                    decode_entities(content)
                } else {
                    content.to_string()
                };
                open.children.push(VNode::text(content));
            }
            self.push_node(open.finish());
        } else {
            self.stack.push(open);
        }
        Ok(())
    }

    fn parse_attribute(&mut self, tag_start: usize) -> ParseResult<(String, String)> {
        let name = self
            .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
            .to_ascii_lowercase();
        if name.is_empty() {
            return Err(ParseError::invalid_syntax(self.pos, "expected attribute name"));
        }
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = rest[1..]
                    .find(quote)
                    .ok_or(ParseError::unexpected_eof(tag_start))?;
                let raw = &rest[1..1 + end];
                self.pos += end + 2;
                raw
            }
            Some(_) => self.take_while(|c| !c.is_whitespace() && c != '>'),
            None => return Err(ParseError::unexpected_eof(tag_start)),
        };
        Ok((name, decode_entities(value)))
    }

    /// Consume everything up to the matching end tag of a raw text element
    fn take_raw_text(&mut self, tag: &str) -> &'src str {
        let rest = self.rest();
        let closing = format!("</{}", tag);
        let end = find_ignore_case(rest, &closing).unwrap_or(rest.len());
        let content = &rest[..end];
        self.pos += end;
        if !self.is_at_end() {
            let close_end = self.rest().find('>').map(|i| i + 1).unwrap_or(self.rest().len());
            self.pos += close_end;
        }
        content
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> &'src str {
        let rest = self.rest();
        let len = rest.find(|c: char| !predicate(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Decode the character references that appear in authored markup
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_with_doctype() {
        let doc = parse_document("<!DOCTYPE html><html><body><p>Hi</p></body></html>").unwrap();
        assert_eq!(doc.doctype.as_deref(), Some("html"));
        let p = doc.node_at(&[0, 0, 0]).unwrap();
        assert!(p.is_tag("p"));
        assert_eq!(p.text_content(), "Hi");
    }

    #[test]
    fn test_attributes_quoted_unquoted_and_bare() {
        let nodes = parse_fragment(r#"<input type=text value="a &amp; b" disabled data-x='1'>"#).unwrap();
        let input = &nodes[0];
        assert_eq!(input.attr("type"), Some("text"));
        assert_eq!(input.attr("value"), Some("a & b"));
        assert_eq!(input.attr("disabled"), Some(""));
        assert_eq!(input.attr("data-x"), Some("1"));
        assert!(input.children().is_empty());
    }

    #[test]
    fn test_void_and_self_closing_elements_take_no_children() {
        let nodes = parse_fragment("<p>a<br>b<img src=x.png/></p>").unwrap();
        let p = &nodes[0];
        assert_eq!(p.children().len(), 4);
        assert!(p.children()[1].is_tag("br"));
        assert!(p.children()[3].is_tag("img"));
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let nodes = parse_fragment("<div><span>text").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children()[0].text_content(), "text");
    }

    #[test]
    fn test_stray_end_tag_is_dropped() {
        let nodes = parse_fragment("<div>a</span>b</div>").unwrap();
        assert_eq!(nodes[0].text_content(), "ab");
    }

    #[test]
    fn test_end_tag_closes_intermediate_elements() {
        let nodes = parse_fragment("<ul><li>one<li>two</ul><p>after</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1].is_tag("p"));
    }

    #[test]
    fn test_list_items_close_their_open_sibling() {
        let nodes = parse_fragment("<ul><li>one<li>two</ul>").unwrap();
        let items = nodes[0].children();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text_content(), "two");
    }

    #[test]
    fn test_script_content_is_raw() {
        let nodes = parse_fragment("<script>if (a < b && c) {}</script>").unwrap();
        assert_eq!(nodes[0].text_content(), "if (a < b && c) {}");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let nodes = parse_fragment("1 < 2").unwrap();
        assert_eq!(nodes, vec![VNode::text("1 "), VNode::text("< 2")]);
    }

    #[test]
    fn test_comments_are_kept() {
        let nodes = parse_fragment("<!-- note --><p></p>").unwrap();
        assert_eq!(nodes[0], VNode::comment(" note "));
    }

    #[test]
    fn test_truncated_markup_is_an_error() {
        assert!(matches!(
            parse_fragment("<div class=\"a"),
            Err(ParseError::UnexpectedEof { pos: 0 })
        ));
        assert!(matches!(
            parse_fragment("<p></p><!-- open"),
            Err(ParseError::UnterminatedComment { pos: 7 })
        ));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;b&gt; &#65;&#x42; &unknown; &"), "<b> AB &unknown; &");
    }
}
