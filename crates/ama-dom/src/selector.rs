//! CSS Selectors
//!
//! The subset authors put in data attributes: selector lists, descendant
//! and child combinators, type, `#id`, `.class`, attribute selectors and
//! `:not()`. Anything else is rejected with `DomError::InvalidSelector`.

use crate::{DomError, DomTree, NodeId, Result, TokenList};

/// Parsed selector list (`a, b > c`)
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

/// Compounds joined by combinators, left to right
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
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
    attrs: Vec<AttrMatch>,
    negations: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input);
        let mut selectors = Vec::new();
        loop {
            parser.skip_ws();
            selectors.push(parser.complex()?);
            parser.skip_ws();
            match parser.peek() {
                Some(',') => {
                    parser.bump();
                }
                None => break,
                Some(_) => return Err(parser.error()),
            }
        }
        Ok(Self { selectors })
    }

    /// Check if an element matches any selector in the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node)
            && self
                .selectors
                .iter()
                .any(|s| s.matches_from(tree, s.compounds.len() - 1, node))
    }
}

impl Complex {
    fn matches_from(&self, tree: &DomTree, idx: usize, node: NodeId) -> bool {
        if !self.compounds[idx].matches(tree, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|p| self.matches_from(tree, idx - 1, p)),
            Combinator::Descendant => {
                let mut cursor = tree.parent_element(node);
                while let Some(p) = cursor {
                    if self.matches_from(tree, idx - 1, p) {
                        return true;
                    }
                    cursor = tree.parent_element(p);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(elem) = tree.get(node).and_then(|n| n.as_element()) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !elem.is(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if elem.get_attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let list = TokenList::parse(elem.get_attr("class").unwrap_or(""));
            if !self.classes.iter().all(|c| list.contains(c)) {
                return false;
            }
        }
        if !self.attrs.iter().all(|a| a.matches(elem.get_attr(&a.name))) {
            return false;
        }
        !self.negations.iter().any(|n| n.matches(tree, node))
    }
}

impl AttrMatch {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => value == v,
            AttrOp::Includes(v) => value.split_whitespace().any(|t| t == v),
            AttrOp::DashMatch(v) => value == v || value.starts_with(&format!("{v}-")),
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, chars: input.chars().collect(), pos: 0 }
    }

    fn error(&self) -> DomError {
        DomError::InvalidSelector(self.input.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.bump() == Some(c) { Ok(()) } else { Err(self.error()) }
    }

    /// Skip whitespace, reporting whether any was consumed
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                out.push(self.bump().ok_or_else(|| self.error())?);
            } else if Self::is_ident_char(c) {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if out.is_empty() { Err(self.error()) } else { Ok(out) }
    }

    fn complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error()),
            }
            compounds.push(self.compound()?);
        }
        Ok(Complex { compounds, combinators })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut any = false;
        match self.peek() {
            Some('*') => {
                self.bump();
                any = true;
            }
            Some(c) if Self::is_ident_char(c) && !c.is_ascii_digit() => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
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
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.bump();
                    let name = self.ident()?;
                    if !name.eq_ignore_ascii_case("not") {
                        return Err(self.error());
                    }
                    self.expect('(')?;
                    loop {
                        self.skip_ws();
                        compound.negations.push(self.compound()?);
                        self.skip_ws();
                        if self.peek() == Some(',') {
                            self.bump();
                            continue;
                        }
                        break;
                    }
                    self.expect(')')?;
                }
                _ => break,
            }
            any = true;
        }
        if any { Ok(compound) } else { Err(self.error()) }
    }

    fn attribute(&mut self) -> Result<AttrMatch> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let op = match self.bump() {
            Some(']') => return Ok(AttrMatch { name, op: AttrOp::Exists }),
            Some('=') => '=',
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.expect('=')?;
                c
            }
            _ => return Err(self.error()),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == q => break,
                        Some('\\') => out.push(self.bump().ok_or_else(|| self.error())?),
                        Some(c) => out.push(c),
                        None => return Err(self.error()),
                    }
                }
                out
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        self.expect(']')?;
        let op = match op {
            '=' => AttrOp::Equals(value),
            '~' => AttrOp::Includes(value),
            '|' => AttrOp::DashMatch(value),
            '^' => AttrOp::Prefix(value),
            '$' => AttrOp::Suffix(value),
            _ => AttrOp::Substring(value),
        };
        Ok(AttrMatch { name, op })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let nav = tree.create_element("nav");
        let list = tree.create_element("ul");
        let button = tree.create_element("button");
        tree.append_child(NodeId::ROOT, nav).unwrap();
        tree.append_child(nav, list).unwrap();
        tree.append_child(list, button).unwrap();
        let el = tree.get_mut(button).unwrap().as_element_mut().unwrap();
        el.attrs.set_attribute("id", "menu-btn");
        el.attrs.set_attribute("class", "btn primary");
        el.attrs.set_attribute("data-automagica11y-toggle", "#menu");
        tree.get_mut(nav).unwrap().as_element_mut().unwrap().attrs.set_attribute("class", "site");
        (tree, nav, list, button)
    }

    fn matches(sel: &str, tree: &DomTree, node: NodeId) -> bool {
        SelectorList::parse(sel).unwrap().matches(tree, node)
    }

    #[test]
    fn test_simple_selectors() {
        let (tree, _nav, _list, button) = tree();
        assert!(matches("button", &tree, button));
        assert!(matches("#menu-btn", &tree, button));
        assert!(matches(".btn.primary", &tree, button));
        assert!(matches("*", &tree, button));
        assert!(!matches(".secondary", &tree, button));
    }

    #[test]
    fn test_attribute_selectors() {
        let (tree, _nav, _list, button) = tree();
        assert!(matches("[data-automagica11y-toggle]", &tree, button));
        assert!(matches("[data-automagica11y-toggle=\"#menu\"]", &tree, button));
        assert!(matches("[class~=primary]", &tree, button));
        assert!(matches("[id^='menu']", &tree, button));
        assert!(!matches("[disabled]", &tree, button));
        assert!(matches("button:not([disabled])", &tree, button));
    }

    #[test]
    fn test_combinators_and_lists() {
        let (tree, nav, list, button) = tree();
        assert!(matches("nav button", &tree, button));
        assert!(matches("ul > button", &tree, button));
        assert!(!matches("nav > button", &tree, button));
        assert!(matches(".site > ul", &tree, list));
        assert!(matches("a, nav", &tree, nav));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("div:hover").is_err());
        assert!(SelectorList::parse("[unterminated").is_err());
        assert!(SelectorList::parse("a,").is_err());
    }
}
