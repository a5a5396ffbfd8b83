//! Selectors - The CSS subset used by scoped element queries.
//!
//! Supported grammar:
//!
//! ```text
//! list      := complex ( "," complex )*
//! complex   := compound ( ( " " | ">" ) compound )*
//! compound  := ( tag | "*" )? ( "." name | "#" name | "[" name ( "=" value )? "]" )*
//! ```
//!
//! Tag names match case-insensitively, everything else is case-sensitive.
//! Names follow CSS identifiers: no leading digit, no lone `-`, no leading
//! `-` plus digit.
//! Unquoted attribute values are not checked.

use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use crate::error::SelectorError;
use super::element::Element;

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// `compounds[i]` relates to `compounds[i + 1]` through `combinators[i]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        Parser::new(source).parse()
    }

    /// True if `element` matches any selector of the list.
    pub fn matches(&self, element: &Element) -> bool {
        self.alternatives.iter().any(|complex| complex.matches(element))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Matching
// =============================================================================

impl Complex {
    fn matches(&self, element: &Element) -> bool {
        self.matches_at(self.compounds.len() - 1, element)
    }

    fn matches_at(&self, index: usize, element: &Element) -> bool {
        if !self.compounds[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_at(index - 1, &parent)),
            Combinator::Descendant => {
                let mut ancestor = element.parent();
                while let Some(current) = ancestor {
                    if self.matches_at(index - 1, &current) {
                        return true;
                    }
                    ancestor = current.parent();
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        let id = element.id();
        if !self.ids.iter().all(|want| id.as_deref() == Some(want.as_str())) {
            return false;
        }

        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        self.attrs.iter().all(|attr| match (&attr.value, element.attr(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(have)) => *want == have,
        })
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Names may not start with a digit, or with `-` followed by a digit.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(c) if c.is_ascii_digit() => false,
        Some('-') => chars.next().is_some_and(|c| !c.is_ascii_digit()),
        Some(_) => true,
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_complex()?);

            match self.chars.next() {
                None => break,
                Some((offset, ',')) => {
                    self.skip_whitespace();
                    if self.chars.peek().is_none() {
                        return Err(self.unexpected(',', offset));
                    }
                }
                Some((offset, found)) => return Err(self.unexpected(found, offset)),
            }
        }

        Ok(Selector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();

        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.chars.peek().copied() {
                None | Some((_, ',')) => break,
                Some((_, '>')) => {
                    self.chars.next();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some((offset, found)) => return Err(self.unexpected(found, offset)),
            };

            if matches!(self.chars.peek(), None | Some((_, ','))) {
                return Err(SelectorError::DanglingCombinator(self.source.to_string()));
            }

            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut matched_any = false;

        match self.chars.peek().copied() {
            Some((_, '*')) => {
                self.chars.next();
                matched_any = true;
            }
            Some((offset, c)) if is_name_char(c) => {
                let tag = self.read_name();
                if !is_identifier(&tag) {
                    return Err(self.unexpected(c, offset));
                }
                compound.tag = Some(tag.to_ascii_lowercase());
                matched_any = true;
            }
            _ => {}
        }

        while let Some((offset, c)) = self.chars.peek().copied() {
            match c {
                '.' | '#' => {
                    self.chars.next();
                    let name = self.read_name();
                    if !is_identifier(&name) {
                        return Err(self.missing_name(c, offset));
                    }
                    if c == '.' {
                        compound.classes.push(name);
                    } else {
                        compound.ids.push(name);
                    }
                }
                '[' => {
                    self.chars.next();
                    compound.attrs.push(self.parse_attribute(offset)?);
                }
                _ => break,
            }
            matched_any = true;
        }

        if !matched_any {
            return Err(match self.chars.peek().copied() {
                Some((offset, found)) => self.unexpected(found, offset),
                None => SelectorError::DanglingCombinator(self.source.to_string()),
            });
        }

        Ok(compound)
    }

    /// Parse the rest of `[name]` or `[name=value]`, the `[` already consumed.
    fn parse_attribute(&mut self, open_offset: usize) -> Result<AttrMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.read_name();
        if !is_identifier(&name) {
            if !name.is_empty() {
                return Err(self.missing_name('[', open_offset));
            }
            return match self.chars.peek().copied() {
                None => Err(SelectorError::UnterminatedAttribute(self.source.to_string())),
                Some(_) => Err(self.missing_name('[', open_offset)),
            };
        }
        self.skip_whitespace();

        let value = match self.chars.next() {
            Some((_, ']')) => return Ok(AttrMatch { name, value: None }),
            Some((_, '=')) => {
                self.skip_whitespace();
                self.read_value()?
            }
            Some((offset, found)) => return Err(self.unexpected(found, offset)),
            None => return Err(SelectorError::UnterminatedAttribute(self.source.to_string())),
        };

        self.skip_whitespace();
        match self.chars.next() {
            Some((_, ']')) => Ok(AttrMatch {
                name,
                value: Some(value),
            }),
            Some((offset, found)) => Err(self.unexpected(found, offset)),
            None => Err(SelectorError::UnterminatedAttribute(self.source.to_string())),
        }
    }

    fn read_value(&mut self) -> Result<String, SelectorError> {
        let quote = match self.chars.peek().copied() {
            Some((_, q @ ('"' | '\''))) => q,
            _ => return Ok(self.read_name()),
        };
        self.chars.next();

        let mut value = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == quote {
                return Ok(value);
            }
            value.push(c);
        }
        Err(SelectorError::UnterminatedAttribute(self.source.to_string()))
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        name
    }

    /// Returns true if any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }

    fn unexpected(&self, found: char, offset: usize) -> SelectorError {
        SelectorError::UnexpectedChar {
            selector: self.source.to_string(),
            found,
            offset,
        }
    }

    fn missing_name(&self, prefix: char, offset: usize) -> SelectorError {
        SelectorError::MissingName {
            selector: self.source.to_string(),
            prefix,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Element, Element, Element, Element) {
        let item = Element::new("li").with_class("item").with_attr("data-kind", "rust");
        let nested = Element::new("a").with_id("link").with_class("item");
        let other = Element::new("li").with_child(nested.clone());
        let list = Element::new("ul")
            .with_class("list")
            .with_child(item.clone())
            .with_child(other.clone());
        (list, item, other, nested)
    }

    #[test]
    fn test_compound_matching() {
        let (_list, item, other, nested) = tree();

        let selector = Selector::parse("li.item").unwrap();
        assert!(selector.matches(&item));
        assert!(!selector.matches(&other));
        assert!(!selector.matches(&nested));

        assert!(Selector::parse("#link").unwrap().matches(&nested));
        assert!(Selector::parse("A#link.item").unwrap().matches(&nested));
        assert!(Selector::parse("*").unwrap().matches(&other));
    }

    #[test]
    fn test_attribute_matching() {
        let (_list, item, other, _nested) = tree();

        assert!(Selector::parse("[data-kind]").unwrap().matches(&item));
        assert!(Selector::parse("[data-kind=rust]").unwrap().matches(&item));
        assert!(Selector::parse("li[data-kind=\"rust\"]").unwrap().matches(&item));
        assert!(!Selector::parse("[data-kind='go']").unwrap().matches(&item));
        assert!(!Selector::parse("[data-kind]").unwrap().matches(&other));
    }

    #[test]
    fn test_combinators() {
        let (list, item, _other, nested) = tree();

        let descendant = Selector::parse(".list .item").unwrap();
        assert!(descendant.matches(&item));
        assert!(descendant.matches(&nested));

        let child = Selector::parse(".list > .item").unwrap();
        assert!(child.matches(&item));
        assert!(!child.matches(&nested));

        assert_eq!(list.select(&child).len(), 1);
        assert_eq!(list.select(&descendant).len(), 2);
    }

    #[test]
    fn test_selector_list() {
        let (list, _item, _other, _nested) = tree();
        let matched = list.query("#link, li.item").unwrap();

        // Document order, not selector order
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].tag(), "li");
        assert_eq!(matched[1].tag(), "a");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("li."),
            Err(SelectorError::MissingName { prefix: '.', offset: 2, .. })
        ));
        assert!(matches!(
            Selector::parse("li, "),
            Err(SelectorError::UnexpectedChar { found: ',', offset: 2, .. })
        ));
        assert!(matches!(
            Selector::parse("li >"),
            Err(SelectorError::DanglingCombinator(_))
        ));
        assert!(matches!(
            Selector::parse("[data-kind=rust"),
            Err(SelectorError::UnterminatedAttribute(_))
        ));
        assert!(matches!(
            Selector::parse("li!"),
            Err(SelectorError::UnexpectedChar { found: '!', .. })
        ));
    }

    #[test]
    fn test_names_cannot_start_with_digit() {
        assert!(matches!(
            Selector::parse(".1a"),
            Err(SelectorError::MissingName { prefix: '.', offset: 0, .. })
        ));
        assert!(matches!(
            Selector::parse("li#-2"),
            Err(SelectorError::MissingName { prefix: '#', offset: 2, .. })
        ));
        assert!(matches!(
            Selector::parse(".-"),
            Err(SelectorError::MissingName { prefix: '.', offset: 0, .. })
        ));
        assert!(matches!(
            Selector::parse("[1x]"),
            Err(SelectorError::MissingName { prefix: '[', offset: 0, .. })
        ));
        assert!(matches!(
            Selector::parse("2li"),
            Err(SelectorError::UnexpectedChar { found: '2', offset: 0, .. })
        ));

        assert!(Selector::parse(".-a, #_1, .a1, h2").is_ok());
        assert!(Selector::parse("[data-n=1]").is_ok());
    }

    #[test]
    fn test_from_str() {
        let selector: Selector = ".item".parse().unwrap();
        assert_eq!(selector, Selector::parse(".item").unwrap());
    }
}
