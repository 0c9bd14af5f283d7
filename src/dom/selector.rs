//! Compound CSS selectors.
//!
//! Supports the subset the engine and its listeners need: a type selector
//! followed by any number of `#id`, `.class`, `[attr]`, `[attr="value"]` and
//! `:not(...)` parts. Combinators and selector lists are rejected.

use std::fmt;

use thiserror::Error;

use super::ElementData;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{found}` at offset {offset} in `{input}`")]
    Unexpected {
        input: String,
        found: char,
        offset: usize,
    },
    #[error("unterminated `{0}` in selector")]
    Unterminated(char),
}

/// One attribute condition of a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Exists(String),
    Equals(String, String),
    /// Whitespace-separated token match (`.class`).
    Includes(String, String),
}

impl AttrMatch {
    fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Exists(name) => element.has_attr(name),
            Self::Equals(name, value) => element.attr(name) == Some(value.as_str()),
            Self::Includes(name, token) => element
                .attr(name)
                .is_some_and(|v| v.split_whitespace().any(|t| t == token)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    attrs: Vec<AttrMatch>,
    negations: Vec<Selector>,
}

impl Selector {
    /// Match any element with the given tag name.
    pub fn tag(name: &str) -> Self {
        Self {
            tag: Some(name.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn with_id(self, id: &str) -> Self {
        self.with_attr_eq("id", id)
    }

    pub fn with_attr(mut self, name: &str) -> Self {
        self.attrs.push(AttrMatch::Exists(name.to_string()));
        self
    }

    pub fn with_attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attrs
            .push(AttrMatch::Equals(name.to_string(), value.to_string()));
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.attrs
            .push(AttrMatch::Includes("class".to_string(), class.to_string()));
        self
    }

    pub fn not(mut self, negated: Selector) -> Self {
        self.negations.push(negated);
        self
    }

    pub fn matches(&self, element: &ElementData) -> bool {
        self.tag.as_ref().is_none_or(|t| *t == element.name)
            && self.attrs.iter().all(|a| a.matches(element))
            && !self.negations.iter().any(|n| n.matches(element))
    }

    /// Parse a compound selector such as `turbo-frame[src]:not([loading="lazy"])`.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser {
            input: trimmed,
            pos: 0,
        };
        let selector = parser.compound()?;
        match parser.peek() {
            None => Ok(selector),
            Some(c) => Err(parser.unexpected(c)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for attr in &self.attrs {
            match attr {
                AttrMatch::Exists(name) => write!(f, "[{name}]")?,
                AttrMatch::Equals(name, value) if name == "id" && is_ident(value) => {
                    write!(f, "#{value}")?
                }
                AttrMatch::Equals(name, value) => {
                    write!(f, "[{name}=\"{}\"]", value.replace('"', "\\\""))?
                }
                AttrMatch::Includes(_, token) => write!(f, ".{token}")?,
            }
        }
        for negated in &self.negations {
            write!(f, ":not({negated})")?;
        }
        if self.tag.is_none() && self.attrs.is_empty() && self.negations.is_empty() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_') || !c.is_ascii()
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= c.len_utf8();
                Err(self.unexpected(c))
            }
            None => Err(SelectorError::Unterminated(expected)),
        }
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            input: self.input.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn compound(&mut self) -> Result<Selector, SelectorError> {
        let mut selector = Selector::default();

        if self.peek() == Some('*') {
            self.bump();
        } else if self.peek().is_some_and(is_ident_char) {
            selector.tag = Some(self.ident()?.to_ascii_lowercase());
        }

        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    self.bump();
                    let id = self.ident()?;
                    selector = selector.with_id(&id);
                }
                '.' => {
                    self.bump();
                    let class = self.ident()?;
                    selector = selector.with_class(&class);
                }
                '[' => {
                    self.bump();
                    selector.attrs.push(self.attribute()?);
                }
                ':' => {
                    self.bump();
                    let pseudo = self.ident()?;
                    if pseudo != "not" {
                        return Err(SelectorError::Unexpected {
                            input: self.input.to_string(),
                            found: ':',
                            offset: self.pos - pseudo.len() - 1,
                        });
                    }
                    self.eat('(')?;
                    let negated = self.compound()?;
                    self.eat(')')?;
                    selector.negations.push(negated);
                }
                _ => break,
            }
        }

        Ok(selector)
    }

    fn attribute(&mut self) -> Result<AttrMatch, SelectorError> {
        let name = self.ident()?.to_ascii_lowercase();
        match self.bump() {
            Some(']') => Ok(AttrMatch::Exists(name)),
            Some('=') => {
                let value = match self.peek() {
                    Some(q @ ('"' | '\'')) => {
                        self.bump();
                        self.quoted(q)?
                    }
                    _ => self.ident()?,
                };
                self.eat(']')?;
                Ok(AttrMatch::Equals(name, value))
            }
            Some(c) => {
                self.pos -= c.len_utf8();
                Err(self.unexpected(c))
            }
            None => Err(SelectorError::Unterminated(']')),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => value.push(c),
                    None => return Err(SelectorError::Unterminated(quote)),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(SelectorError::Unterminated(quote)),
            }
        }
    }
}
