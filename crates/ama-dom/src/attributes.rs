//! Element Attributes
//!
//! Attribute storage: get, set, remove, has. Names are ASCII
//! lower-cased on the way in, matching HTML documents.

/// Named node map (attribute collection)
#[derive(Debug, Clone, Default)]
pub struct NamedNodeMap {
    attributes: Vec<Attr>,
}

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut name = name.into();
        name.make_ascii_lowercase();
        Self { name, value: value.into() }
    }

    pub fn is_id(&self) -> bool {
        self.name == "id"
    }
}

impl NamedNodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of attributes
    pub fn length(&self) -> usize {
        self.attributes.len()
    }

    /// Get attribute by index
    pub fn item(&self, index: usize) -> Option<&Attr> {
        self.attributes.get(index)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Get attribute by name
    pub fn get_named_item(&self, name: &str) -> Option<&Attr> {
        self.position(name).map(|i| &self.attributes[i])
    }

    /// Get attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.get_named_item(name).map(|a| a.value.as_str())
    }

    /// Set attribute, returning the previous value if there was one
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        match self.position(name) {
            Some(i) => Some(std::mem::replace(&mut self.attributes[i].value, value.to_string())),
            None => {
                self.attributes.push(Attr::new(name, value));
                None
            }
        }
    }

    /// Remove attribute by name, returning its value
    pub fn remove_named_item(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.attributes.remove(i).value)
    }

    /// Check if attribute exists
    pub fn has_attribute(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Get attribute names in insertion order
    pub fn get_attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Iterate over attributes
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_attribute() {
        let mut attrs = NamedNodeMap::new();
        assert_eq!(attrs.set_attribute("class", "btn"), None);
        attrs.set_attribute("ID", "submit");

        assert_eq!(attrs.length(), 2);
        assert_eq!(attrs.get_attribute("class"), Some("btn"));
        assert_eq!(attrs.get_attribute("id"), Some("submit"));
        assert!(attrs.item(1).unwrap().is_id());
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut attrs = NamedNodeMap::new();
        attrs.set_attribute("aria-expanded", "false");
        assert_eq!(attrs.set_attribute("aria-expanded", "true"), Some("false".into()));
        assert_eq!(attrs.length(), 1);
    }

    #[test]
    fn test_remove_attribute() {
        let mut attrs = NamedNodeMap::new();
        attrs.set_attribute("hidden", "");

        assert!(attrs.has_attribute("hidden"));
        assert_eq!(attrs.remove_named_item("hidden"), Some(String::new()));
        assert!(!attrs.has_attribute("hidden"));
        assert_eq!(attrs.remove_named_item("hidden"), None);
    }
}
