//! CSS selector subset used to address override targets.
//!
//! Supported: type (`h1`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`,
//! descendant (` `) and child (`>`) combinators, and comma-separated lists.
//! Pseudo-classes and sibling combinators are rejected with
//! [`SelectorError::Unsupported`].

use crate::error::{SelectorError, SelectorResult};
use crate::vdom::{Document, NodePath, VNode};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum SelectorToken<'src> {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"-?[_a-zA-Z][_a-zA-Z0-9-]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"#[_a-zA-Z0-9-]+", |lex| &lex.slice()[1..])]
    Hash(&'src str),

    #[regex(r#""([^"\\]|\\.)*"|'([^'\\]|\\.)*'"#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Quoted(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice())]
    Number(&'src str),

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("=")]
    Eq,

    #[token(">")]
    Gt,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token("+")]
    Plus,

    #[token("~")]
    Tilde,
}

/// Tokenize a selector, failing on the first unrecognized character
pub fn tokenize(source: &str) -> SelectorResult<Vec<(SelectorToken<'_>, usize)>> {
    SelectorToken::lexer(source)
        .spanned()
        .map(|(result, span)| {
            result
                .map(|token| (token, span.start))
                .map_err(|_| SelectorError::LexerError { pos: span.start })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub value: Option<String>,
}

/// Simple selectors that must all hold for one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    /// Explicit `*`
    pub universal: bool,
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    pub fn matches(&self, node: &VNode) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|attr| match (&attr.value, node.attr(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compounds joined by combinators, e.g. `#hero > .title h1`
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    /// `(combinator to the previous part, compound)`; the first combinator is unused
    parts: Vec<(Combinator, Compound)>,
}

impl ComplexSelector {
    pub fn matches(&self, node: &VNode, ancestors: &[&VNode]) -> bool {
        self.matches_from(self.parts.len() - 1, node, ancestors)
    }

    fn matches_from(&self, index: usize, node: &VNode, ancestors: &[&VNode]) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => ancestors
                .split_last()
                .is_some_and(|(parent, rest)| self.matches_from(index - 1, parent, rest)),
            Combinator::Descendant => {
                let mut rest = ancestors;
                while let Some((ancestor, above)) = rest.split_last() {
                    if self.matches_from(index - 1, ancestor, above) {
                        return true;
                    }
                    rest = above;
                }
                false
            }
        }
    }
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<ComplexSelector>,
}

impl Selector {
    pub fn parse(source: &str) -> SelectorResult<Self> {
        let tokens = tokenize(source)?;
        SelectorParser { tokens, pos: 0 }.parse_list()
    }

    pub fn matches(&self, node: &VNode, ancestors: &[&VNode]) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(node, ancestors))
    }

    /// Paths of every matching element in document order
    pub fn select_all(&self, document: &Document) -> Vec<NodePath> {
        let mut found = Vec::new();
        document.walk_elements(|path, node, ancestors| {
            if self.matches(node, ancestors) {
                found.push(path.clone());
            }
        });
        found
    }
}

struct SelectorParser<'src> {
    tokens: Vec<(SelectorToken<'src>, usize)>,
    pos: usize,
}

impl<'src> SelectorParser<'src> {
    fn peek(&self) -> Option<&SelectorToken<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, offset)| *offset).unwrap_or(0)
    }

    fn advance(&mut self) -> Option<SelectorToken<'src>> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Skip whitespace, reporting whether any was consumed
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while let Some(SelectorToken::Whitespace) = self.peek() {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn parse_list(&mut self) -> SelectorResult<Selector> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut alternatives = vec![self.parse_complex()?];
        while let Some(SelectorToken::Comma) = self.peek() {
            self.advance();
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
        }

        match self.peek() {
            None => Ok(Selector { alternatives }),
            Some(token) => Err(SelectorError::unexpected_token(
                self.offset(),
                "end of selector",
                format!("{:?}", token),
            )),
        }
    }

    fn parse_complex(&mut self) -> SelectorResult<ComplexSelector> {
        let mut parts = vec![(Combinator::Descendant, self.parse_compound()?)];

        loop {
            let saw_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(SelectorToken::Comma) => break,
                Some(SelectorToken::Gt) => {
                    self.advance();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(SelectorToken::Plus) | Some(SelectorToken::Tilde) => {
                    return Err(SelectorError::unsupported(self.offset(), "sibling combinator"));
                }
                Some(_) if saw_space => Combinator::Descendant,
                Some(token) => {
                    return Err(SelectorError::unexpected_token(
                        self.offset(),
                        "combinator",
                        format!("{:?}", token),
                    ));
                }
            };
            parts.push((combinator, self.parse_compound()?));
        }

        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> SelectorResult<Compound> {
        let mut compound = Compound::default();

        match self.peek() {
            Some(SelectorToken::Ident(name)) => {
                compound.tag = Some(name.to_ascii_lowercase());
                self.advance();
            }
            Some(SelectorToken::Star) => {
                compound.universal = true;
                self.advance();
            }
            _ => {}
        }

        loop {
            let offset = self.offset();
            match self.peek() {
                Some(SelectorToken::Hash(id)) => {
                    compound.id = Some(id.to_string());
                    self.advance();
                }
                Some(SelectorToken::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(SelectorToken::Ident(class)) => compound.classes.push(class.to_string()),
                        Some(token) => {
                            return Err(SelectorError::unexpected_token(
                                offset,
                                "class name",
                                format!("{:?}", token),
                            ))
                        }
                        None => return Err(SelectorError::unexpected_end("class name")),
                    }
                }
                Some(SelectorToken::LBracket) => {
                    self.advance();
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(SelectorToken::Colon) => {
                    return Err(SelectorError::unsupported(offset, "pseudo-class"));
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return match self.peek() {
                Some(token) => Err(SelectorError::unexpected_token(
                    self.offset(),
                    "selector",
                    format!("{:?}", token),
                )),
                None => Err(SelectorError::unexpected_end("selector")),
            };
        }

        Ok(compound)
    }

    fn parse_attribute(&mut self) -> SelectorResult<AttributeSelector> {
        self.skip_whitespace();
        let name = match self.advance() {
            Some(SelectorToken::Ident(name)) => name.to_ascii_lowercase(),
            Some(token) => {
                return Err(SelectorError::unexpected_token(
                    self.offset(),
                    "attribute name",
                    format!("{:?}", token),
                ))
            }
            None => return Err(SelectorError::unexpected_end("attribute name")),
        };
        self.skip_whitespace();

        let value = match self.peek() {
            Some(SelectorToken::Eq) => {
                self.advance();
                self.skip_whitespace();
                let value = match self.advance() {
                    Some(SelectorToken::Ident(v))
                    | Some(SelectorToken::Quoted(v))
                    | Some(SelectorToken::Number(v)) => v.to_string(),
                    Some(token) => {
                        return Err(SelectorError::unexpected_token(
                            self.offset(),
                            "attribute value",
                            format!("{:?}", token),
                        ))
                    }
                    None => return Err(SelectorError::unexpected_end("attribute value")),
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => None,
        };

        match self.advance() {
            Some(SelectorToken::RBracket) => Ok(AttributeSelector { name, value }),
            Some(SelectorToken::Tilde) | Some(SelectorToken::Plus) => Err(
                SelectorError::unsupported(self.offset(), "attribute operator"),
            ),
            Some(token) => Err(SelectorError::unexpected_token(
                self.offset(),
                "]",
                format!("{:?}", token),
            )),
            None => Err(SelectorError::unexpected_end("]")),
        }
    }
}
