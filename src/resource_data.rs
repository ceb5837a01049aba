//! Typed attribute bag exchanged with the hosting plugin framework.
//!
//! Each resource type declares a static schema. Reads never fail: unset
//! attributes yield their default or zero value, and the `get_ok_*` family
//! additionally reports presence. Writes are checked against the schema.

use crate::error::Error;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    String,
    Bool,
    StringSet,
    Blocks,
}

/// Structured block element of a `Blocks` attribute.
pub type Block = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Bool(bool),
    StringSet(BTreeSet<String>),
    Blocks(Vec<Block>),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::String(_) => AttrType::String,
            AttrValue::Bool(_) => AttrType::Bool,
            AttrValue::StringSet(_) => AttrType::StringSet,
            AttrValue::Blocks(_) => AttrType::Blocks,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<Option<&str>> for AttrValue {
    fn from(value: Option<&str>) -> Self {
        AttrValue::String(value.unwrap_or_default().to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<BTreeSet<String>> for AttrValue {
    fn from(values: BTreeSet<String>) -> Self {
        AttrValue::StringSet(values)
    }
}

impl From<Vec<Block>> for AttrValue {
    fn from(blocks: Vec<Block>) -> Self {
        AttrValue::Blocks(blocks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Str(&'static str),
    Bool(bool),
}

impl From<Literal> for AttrValue {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Str(value) => AttrValue::String(value.to_string()),
            Literal::Bool(value) => AttrValue::Bool(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub ty: AttrType,
    pub default: Option<Literal>,
}

impl AttrSpec {
    pub const fn new(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    pub const fn with_default(self, default: Literal) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

pub type Schema = &'static [AttrSpec];

#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: Schema,
    id: String,
    values: BTreeMap<&'static str, AttrValue>,
}

impl ResourceData {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            id: String::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn builder(schema: Schema) -> ResourceDataBuilder {
        ResourceDataBuilder {
            data: Self::new(schema),
            error: None,
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Drops the resource from tracking.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    fn spec(&self, name: &str) -> Option<&'static AttrSpec> {
        self.schema.iter().find(|spec| spec.name == name)
    }

    /// Returns the configured value, falling back to the schema default.
    pub fn get(&self, name: &str) -> Option<AttrValue> {
        let spec = self.spec(name)?;
        self.values
            .get(spec.name)
            .cloned()
            .or_else(|| spec.default.map(AttrValue::from))
    }

    pub fn get_str(&self, name: &str) -> String {
        match self.get(name) {
            Some(AttrValue::String(value)) => value,
            _ => String::new(),
        }
    }

    /// Returns the string value only when it is set and non-empty.
    pub fn get_ok_str(&self, name: &str) -> Option<String> {
        Some(self.get_str(name)).filter(|value| !value.is_empty())
    }

    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(AttrValue::Bool(true)))
    }

    pub fn get_string_set(&self, name: &str) -> BTreeSet<String> {
        match self.get(name) {
            Some(AttrValue::StringSet(values)) => values,
            _ => BTreeSet::new(),
        }
    }

    pub fn get_blocks(&self, name: &str) -> Vec<Block> {
        match self.get(name) {
            Some(AttrValue::Blocks(blocks)) => blocks,
            _ => Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> Result<(), Error> {
        let value = value.into();
        let spec = self.spec(name).ok_or_else(|| Error::Attribute {
            attribute: name.to_string(),
            message: "attribute is not part of the schema".to_string(),
        })?;
        if spec.ty != value.attr_type() {
            return Err(Error::Attribute {
                attribute: name.to_string(),
                message: format!(
                    "type mismatch: expected {:?}, got {:?}",
                    spec.ty,
                    value.attr_type()
                ),
            });
        }
        self.values.insert(spec.name, value);
        Ok(())
    }
}

/// Chained configuration assembly. The first schema violation is kept and
/// reported by [`ResourceDataBuilder::build`]; later values are ignored.
#[derive(Debug)]
pub struct ResourceDataBuilder {
    data: ResourceData,
    error: Option<Error>,
}

impl ResourceDataBuilder {
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.data.set(name, value) {
                self.error = Some(err);
            }
        }
        self
    }

    pub fn build(self) -> Result<ResourceData, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}
