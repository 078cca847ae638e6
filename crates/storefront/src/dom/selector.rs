//! CSS selector subset used by the storefront class contract.
//!
//! Supported: selector lists (`a, b`), descendant combinators (`a b`), and
//! compound selectors built from a tag or `*`, `.class`, `#id`, `[attr]` and
//! `[attr=value]` (value optionally quoted).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{Document, NodeId};

/// Selector parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected character {ch:?} at {pos} in selector {selector:?}")]
    Unexpected {
        selector: String,
        ch: char,
        pos: usize,
    },
    #[error("Unterminated attribute selector in {0:?}")]
    UnterminatedAttribute(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

// Compounds left to right, joined by descendant combinators
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<Compound>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input, unsupported syntax, or an unclosed
    /// attribute selector.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = source
            .split(',')
            .map(|part| parse_complex(source, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    /// Parse a selector that is part of the page's fixed class contract.
    ///
    /// Invalid input is logged and yields a selector that matches nothing.
    #[must_use]
    pub fn fixed(source: &'static str) -> Self {
        Self::parse(source).unwrap_or_else(|e| {
            tracing::error!(selector = source, error = %e, "Invalid built-in selector");
            Self {
                source: source.to_string(),
                alternatives: Vec::new(),
            }
        })
    }

    /// Selector text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(super) fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node) && self.alternatives.iter().any(|c| c.matches(doc, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let mut compounds = self.0.iter().rev();
        let Some(subject) = compounds.next() else {
            return false;
        };
        if !subject.matches(doc, node) {
            return false;
        }

        // Descendant-only chains can be matched greedily bottom-up
        let mut ancestors = doc.ancestors(node).skip(1);
        compounds.all(|compound| ancestors.any(|a| compound.matches(doc, a)))
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        self.tag.as_deref().is_none_or(|t| t == tag)
            && self.id.as_deref().is_none_or(|id| doc.id(node) == Some(id))
            && self.classes.iter().all(|c| doc.has_class(node, c))
            && self.attrs.iter().all(|a| match (&a.value, doc.attr(node, &a.name)) {
                (None, found) => found.is_some(),
                (Some(expected), Some(found)) => expected == found,
                (Some(_), None) => false,
            })
    }
}

fn parse_complex(source: &str, part: &str) -> Result<Complex, SelectorError> {
    let compounds = part
        .split_whitespace()
        .map(|token| parse_compound(source, token))
        .collect::<Result<Vec<_>, _>>()?;
    if compounds.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Complex(compounds))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(source: &str, token: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let chars: Vec<(usize, char)> = token.char_indices().collect();
    let mut i = 0;

    let unexpected = |pos: usize, ch: char| SelectorError::Unexpected {
        selector: source.to_string(),
        ch,
        pos,
    };

    let read_ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while chars.get(end).is_some_and(|&(_, c)| is_ident_char(c)) {
            end += 1;
        }
        let ident = chars
            .get(start..end)
            .map(|s| s.iter().map(|&(_, c)| c).collect())
            .unwrap_or_default();
        (ident, end)
    };

    while let Some(&(pos, c)) = chars.get(i) {
        match c {
            '*' if i == 0 => i += 1,
            '.' | '#' => {
                let (ident, next) = read_ident(i + 1);
                if ident.is_empty() {
                    return Err(unexpected(pos, c));
                }
                if c == '.' {
                    compound.classes.push(ident);
                } else {
                    compound.id = Some(ident);
                }
                i = next;
            }
            '[' => {
                let close = chars
                    .iter()
                    .skip(i)
                    .position(|&(_, c)| c == ']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| SelectorError::UnterminatedAttribute(source.to_string()))?;
                let inner: String = chars
                    .get(i + 1..close)
                    .map(|s| s.iter().map(|&(_, c)| c).collect())
                    .unwrap_or_default();
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_ascii_lowercase(),
                        Some(value.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (inner.trim().to_ascii_lowercase(), None),
                };
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return Err(unexpected(pos, c));
                }
                compound.attrs.push(AttrMatch { name, value });
                i = close + 1;
            }
            c if i == 0 && is_ident_char(c) => {
                let (ident, next) = read_ident(i);
                compound.tag = Some(ident.to_ascii_lowercase());
                i = next;
            }
            other => return Err(unexpected(pos, other)),
        }
    }

    Ok(compound)
}
