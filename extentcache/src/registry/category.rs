//! Data model categories: the partition key for cached data.

use std::fmt;

/// One field of a category: a concrete value or a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CategoryField {
    #[default]
    Any,
    Exact(String),
}

impl CategoryField {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True if this field admits everything `other` admits.
    fn covers(&self, other: &CategoryField) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Exact(_), Self::Any) => false,
        }
    }

    /// True if the two fields admit a common value.
    fn overlaps(&self, other: &CategoryField) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

impl From<&str> for CategoryField {
    fn from(value: &str) -> Self {
        if value == "*" {
            Self::Any
        } else {
            Self::Exact(value.to_string())
        }
    }
}

/// A (source, family, category) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DataModelCategory {
    pub source: CategoryField,
    pub family: CategoryField,
    pub category: CategoryField,
}

impl DataModelCategory {
    /// Fully specified category. A `"*"` field becomes a wildcard.
    pub fn new(source: &str, family: &str, category: &str) -> Self {
        Self {
            source: source.into(),
            family: family.into(),
            category: category.into(),
        }
    }

    /// The category matching everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = CategoryField::Exact(source.into());
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = CategoryField::Exact(family.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = CategoryField::Exact(category.into());
        self
    }

    /// Provider resolution: every concrete field of this (query) category
    /// equals the provider's declared field. A wildcard declaration accepts
    /// any query value.
    pub fn matches_declared(&self, declared: &DataModelCategory) -> bool {
        self.fields()
            .iter()
            .zip(declared.fields())
            .all(|(query, declared)| query.overlaps(declared))
    }

    /// True if every category admitted by `other` is admitted by this one.
    pub fn covers(&self, other: &DataModelCategory) -> bool {
        self.fields()
            .iter()
            .zip(other.fields())
            .all(|(a, b)| a.covers(b))
    }

    fn fields(&self) -> [&CategoryField; 3] {
        [&self.source, &self.family, &self.category]
    }
}

impl fmt::Display for DataModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.family, self.category)
    }
}
