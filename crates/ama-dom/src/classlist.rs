//! Token lists (classList, aria-labelledby, aria-describedby)
//!
//! Space-separated token sets that keep first-seen order.

/// Ordered set of whitespace-separated tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<String>,
}

impl TokenList {
    /// Create empty token list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a space-separated string, dropping duplicates
    pub fn parse(s: &str) -> Self {
        let mut list = Self::new();
        for token in s.split_whitespace() {
            list.add(token);
        }
        list
    }

    /// Get number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if there are no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check if token exists
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Add a token; returns false if it was already present
    pub fn add(&mut self, token: &str) -> bool {
        if token.is_empty() || self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Remove a token; returns false if it was absent
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        before != self.tokens.len()
    }

    /// Toggle token, returns new state
    pub fn toggle(&mut self, token: &str, force: Option<bool>) -> bool {
        let present = self.contains(token);
        let want = force.unwrap_or(!present);
        if want {
            self.add(token);
        } else {
            self.remove(token);
        }
        want
    }

    /// Iterate tokens in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Serialize back to attribute form
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dedupes() {
        let list = TokenList::parse("  a b   a c ");
        assert_eq!(list.len(), 3);
        assert_eq!(list.value(), "a b c");
    }

    #[test]
    fn test_toggle() {
        let mut list = TokenList::new();
        assert!(list.toggle("open", None));
        assert!(list.contains("open"));
        assert!(!list.toggle("open", None));
        assert!(list.toggle("open", Some(true)));
        assert!(!list.toggle("open", Some(false)));
        assert!(list.is_empty());
    }
}
