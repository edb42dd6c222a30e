//! A small CSS selector subset for the in-memory document.
//!
//! Supported: type (`div`), universal (`*`), `#id`, `.class`, `[attr]`,
//! `[attr=value]`, compound forms (`li.item[data-x]`), the descendant
//! (whitespace) and child (`>`) combinators, and comma-separated lists.

use crate::dom::NodeId;
use crate::error::HostError;

/// What selector matching needs to know about a document.
pub(crate) trait SelectorContext {
    /// Lower-case tag of an element, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, HostError> {
        Parser::new(input).parse()
    }

    pub(crate) fn matches<C: SelectorContext + ?Sized>(&self, ctx: &C, node: NodeId) -> bool {
        ctx.tag_name(node).is_some()
            && self
                .alternatives
                .iter()
                .any(|complex| complex.matches_at(ctx, complex.compounds.len() - 1, node))
    }
}

impl Complex {
    fn matches_at<C: SelectorContext + ?Sized>(&self, ctx: &C, idx: usize, node: NodeId) -> bool {
        if !self.compounds[idx].matches(ctx, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => ctx
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(ctx, idx - 1, parent)),
            Combinator::Descendant => {
                let mut ancestor = ctx.parent_element(node);
                while let Some(current) = ancestor {
                    if self.matches_at(ctx, idx - 1, current) {
                        return true;
                    }
                    ancestor = ctx.parent_element(current);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<C: SelectorContext + ?Sized>(&self, ctx: &C, node: NodeId) -> bool {
        let Some(tag) = ctx.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if ctx.attribute_value(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = ctx.attribute_value(node, "class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|c| c == class))
            {
                return false;
            }
        }
        self.attributes.iter().all(|test| {
            match (ctx.attribute_value(node, &test.name), &test.value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        })
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &'static str) -> HostError {
        HostError::InvalidSelector {
            selector: self.source.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Returns true if any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn parse(mut self) -> Result<Selector, HostError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => self.bump(),
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(Selector { alternatives })
    }

    fn complex(&mut self) -> Result<Complex, HostError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.error("unexpected character")),
            };
            compounds.push(self.compound()?);
            combinators.push(combinator);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, HostError> {
        let mut compound = Compound::default();
        let mut seen = false;

        if self.peek() == Some('*') {
            self.bump();
            seen = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
            seen = true;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            seen = true;
        }

        if seen {
            Ok(compound)
        } else {
            Err(self.error("expected a selector"))
        }
    }

    fn attribute(&mut self) -> Result<AttrTest, HostError> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        let value = if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            Some(match self.peek() {
                Some(quote @ ('"' | '\'')) => self.quoted(quote)?,
                _ => self.ident()?,
            })
        } else {
            None
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error("unterminated attribute selector"));
        }
        self.bump();
        Ok(AttrTest { name, value })
    }

    fn quoted(&mut self, quote: char) -> Result<String, HostError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
    }

    fn ident(&mut self) -> Result<String, HostError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound() {
        let selector = Selector::parse("li.item.active[data-id=\"3\"]").unwrap();
        let compound = &selector.alternatives[0].compounds[0];
        assert_eq!(compound.tag.as_deref(), Some("li"));
        assert_eq!(compound.classes, vec!["item", "active"]);
        assert_eq!(compound.attributes[0].name, "data-id");
        assert_eq!(compound.attributes[0].value.as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_combinators_and_lists() {
        let selector = Selector::parse("ul > li span, #main").unwrap();
        assert_eq!(selector.alternatives.len(), 2);
        assert_eq!(
            selector.alternatives[0].combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
        assert_eq!(
            selector.alternatives[1].compounds[0].id.as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Selector::parse(""),
            Err(HostError::InvalidSelector { .. })
        ));
        assert!(Selector::parse("div >").is_err());
        assert!(Selector::parse("[open").is_err());
        assert!(Selector::parse("a,,b").is_err());
        assert!(Selector::parse("#").is_err());
    }
}
