//! Element tree for thing definition documents

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A single `name="value"` pair on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An attribute-bearing element with ordered children
///
/// Elements are read-only once parsed. Attribute lookup never fails: a missing
/// attribute reads as the empty string, matching how definitions treat absent
/// `template` or `alias` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub span: Span,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            span: 0..0,
        }
    }

    /// Add an attribute, replacing an existing one with the same name
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value, or `""` when the attribute is absent
    pub fn attribute(&self, name: &str) -> &str {
        self.get_attribute(name).unwrap_or("")
    }

    /// Attribute value, or `None` when the attribute is absent
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Child elements in document order
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }
}

/// A parsed definition document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// The batch version carried on the root element
    pub fn version(&self) -> &str {
        self.root.attribute("version")
    }
}
