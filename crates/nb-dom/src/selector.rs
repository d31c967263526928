//! Selector parsing and matching
//!
//! Supports the subset blocks use in event keys: selector lists, compound
//! selectors built from tag, `*`, `#id`, `.class`, `[attr]` and
//! `[attr=value]`, joined by descendant or child combinators.

use crate::{DomError, DomTree, ElementData, NodeId};

/// Simple selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => element.tag.eq_ignore_ascii_case(tag),
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Class(class) => element.has_class(class),
            Self::Attribute { name, value } => match (element.attrs.get(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

/// Relation between a compound selector and the one to its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor
    Descendant,
    /// `>`: the parent
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    parts: Vec<SimpleSelector>,
}

impl Compound {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.element(node)
            .is_some_and(|e| self.parts.iter().all(|s| s.matches(e)))
    }
}

/// Compounds left to right; `steps[i].0` links compound `i` to `i - 1`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    steps: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.matches_at(tree, node, self.steps.len() - 1)
    }

    fn matches_at(&self, tree: &DomTree, node: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.steps[idx];
        if !compound.matches(tree, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|p| self.matches_at(tree, p, idx - 1)),
            Combinator::Descendant => tree
                .ancestors(node)
                .any(|a| self.matches_at(tree, a, idx - 1)),
        }
    }
}

/// Parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let source = input.trim();
        let fail = |message: &str| DomError::InvalidSelector {
            selector: source.to_string(),
            message: message.to_string(),
        };

        if source.is_empty() {
            return Err(fail("empty selector"));
        }

        let mut selectors = Vec::new();
        for part in split_top_level(source) {
            selectors.push(parse_complex(part.trim()).map_err(|m| fail(&m))?);
        }

        Ok(Self {
            source: source.to_string(),
            selectors,
        })
    }

    /// Source text, trimmed
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if a node matches any selector of the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, node))
    }
}

/// Split on commas outside of attribute brackets
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_complex(s: &str) -> Result<Complex, String> {
    if s.is_empty() {
        return Err("empty selector in list".into());
    }

    let mut chars = s.chars().peekable();
    let mut steps: Vec<(Combinator, Compound)> = Vec::new();
    let mut pending = Combinator::Descendant;
    let mut current: Vec<SimpleSelector> = Vec::new();

    let mut flush = |current: &mut Vec<SimpleSelector>, pending: Combinator| {
        if !current.is_empty() {
            steps.push((pending, Compound { parts: std::mem::take(current) }));
        }
    };

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '>' => {
                let mut child = false;
                while let Some(&w) = chars.peek() {
                    match w {
                        '>' if !child => {
                            child = true;
                            chars.next();
                        }
                        '>' => return Err("unexpected `>`".into()),
                        ' ' | '\t' | '\n' => {
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if current.is_empty() {
                    return Err("combinator without left-hand selector".into());
                }
                if chars.peek().is_none() {
                    return Err("combinator without right-hand selector".into());
                }
                // The combinator belongs to the compound that follows
                let previous = pending;
                flush(&mut current, previous);
                pending = if child { Combinator::Child } else { Combinator::Descendant };
            }
            '*' => {
                chars.next();
                current.push(SimpleSelector::Universal);
            }
            '#' | '.' => {
                chars.next();
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return Err(format!("expected name after `{c}`"));
                }
                current.push(if c == '#' {
                    SimpleSelector::Id(name)
                } else {
                    SimpleSelector::Class(name)
                });
            }
            '[' => {
                chars.next();
                current.push(parse_attribute(&mut chars)?);
            }
            c if is_ident_char(c) => {
                if !current.is_empty() {
                    return Err("tag name must come first in a compound selector".into());
                }
                current.push(SimpleSelector::Tag(take_ident(&mut chars).to_ascii_lowercase()));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }

    flush(&mut current, pending);
    if steps.is_empty() {
        return Err("empty selector".into());
    }
    Ok(Complex { steps })
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

fn parse_attribute(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<SimpleSelector, String> {
    let name = take_ident(chars);
    if name.is_empty() {
        return Err("expected attribute name".into());
    }

    match chars.next() {
        Some(']') => Ok(SimpleSelector::Attribute { name, value: None }),
        Some('=') => {
            let value = match chars.peek() {
                Some(&q @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == q => break,
                            Some(c) => value.push(c),
                            None => return Err("unterminated attribute value".into()),
                        }
                    }
                    value
                }
                _ => take_ident(chars),
            };
            match chars.next() {
                Some(']') => Ok(SimpleSelector::Attribute {
                    name,
                    value: Some(value),
                }),
                _ => Err("expected `]`".into()),
            }
        }
        _ => Err("expected `]` or `=`".into()),
    }
}
