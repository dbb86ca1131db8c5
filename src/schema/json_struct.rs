//! JSON struct declarations used by `jsonify`.
use indexmap::IndexMap;

use crate::tokens::JsonVariableType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFieldType {
    Primitive(JsonVariableType),
    /// Another declared struct.
    Object(String),
    /// Array of another declared struct, written `[Name]`.
    ArrayObjects(String),
}

impl JsonFieldType {
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if let Some(ty) = JsonVariableType::from_primitive(tag) {
            return Self::Primitive(ty);
        }
        match tag.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(inner) => Self::ArrayObjects(inner.trim().to_string()),
            None => Self::Object(tag.to_string()),
        }
    }

    pub fn kind(&self) -> JsonVariableType {
        match self {
            Self::Primitive(ty) => *ty,
            Self::Object(_) => JsonVariableType::Object,
            Self::ArrayObjects(_) => JsonVariableType::ArrayObjects,
        }
    }

    /// Referenced struct name, if any.
    pub fn struct_ref(&self) -> Option<&str> {
        match self {
            Self::Object(name) | Self::ArrayObjects(name) => Some(name),
            Self::Primitive(_) => None,
        }
    }

    /// Tag as written in schema files.
    pub fn tag(&self) -> String {
        match self {
            Self::Primitive(ty) => ty.name().to_string(),
            Self::Object(name) => name.clone(),
            Self::ArrayObjects(name) => format!("[{name}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStruct {
    pub name: String,
    pub is_array: bool,
    pub fields: IndexMap<String, JsonFieldType>,
}

impl JsonStruct {
    pub fn new(name: &str, is_array: bool) -> Self {
        Self { name: name.to_string(), is_array, fields: IndexMap::new() }
    }

    pub fn field(mut self, name: &str, tag: &str) -> Self {
        self.fields.insert(name.to_string(), JsonFieldType::parse(tag));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags() {
        assert_eq!(JsonFieldType::parse("string"), JsonFieldType::Primitive(JsonVariableType::String));
        assert_eq!(JsonFieldType::parse("[Item]"), JsonFieldType::ArrayObjects("Item".into()));
        assert_eq!(JsonFieldType::parse("Author"), JsonFieldType::Object("Author".into()));
        assert_eq!(JsonFieldType::parse("[Item]").tag(), "[Item]");
        assert_eq!(JsonFieldType::parse("optional_number").kind(), JsonVariableType::OptionalNumber);
    }
}
