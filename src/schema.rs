//! Schema model: named record kinds built from `Document` pipelines.
pub mod json_struct;
pub mod loader;
pub mod registry;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

pub use json_struct::{JsonFieldType, JsonStruct};
pub use registry::SchemaRegistry;

use crate::document::Document;
use crate::path_de::PathError;
use crate::tokens::{PRE_VALIDATE, StructType, VariableType, is_magic_field};

#[derive(Debug, Clone, PartialEq)]
pub struct ClassVar {
    pub value: Value,
    /// Exposed as an output field.
    pub returned: bool,
}

impl ClassVar {
    pub fn value_type(&self) -> VariableType {
        literal_type(&self.value)
    }
}

/// Value type of a literal.
pub fn literal_type(value: &Value) -> VariableType {
    match value {
        Value::String(_) => VariableType::String,
        Value::Bool(_) => VariableType::Bool,
        Value::Number(n) if n.is_f64() => VariableType::Float,
        Value::Number(_) => VariableType::Int,
        Value::Null => VariableType::Null,
        Value::Array(items) if items.iter().all(Value::is_string) => VariableType::ListString,
        Value::Array(items) if items.iter().all(|v| v.is_i64() || v.is_u64()) => VariableType::ListInt,
        Value::Array(items) if items.iter().all(Value::is_number) => VariableType::ListFloat,
        _ => VariableType::Any,
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub kind: StructType,
    pub doc: String,
    pub extends: Vec<String>,
    pub classvars: IndexMap<String, ClassVar>,
    pub fields: IndexMap<String, Document>,
    /// 1-based source lines, filled by the file loader.
    pub field_lines: IndexMap<String, usize>,
}

impl Schema {
    pub fn new(name: &str, kind: StructType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            doc: String::new(),
            extends: Vec::new(),
            classvars: IndexMap::new(),
            fields: IndexMap::new(),
            field_lines: IndexMap::new(),
        }
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.extends.push(parent.to_string());
        self
    }

    pub fn classvar(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.classvars.insert(name.to_string(), ClassVar { value: value.into(), returned: false });
        self
    }

    pub fn returned_classvar(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.classvars.insert(name.to_string(), ClassVar { value: value.into(), returned: true });
        self
    }

    pub fn field(mut self, name: &str, doc: Document) -> Self {
        self.fields.insert(name.to_string(), doc);
        self
    }

    /// Fields other than the `__MAGIC__` ones, in declaration order.
    pub fn user_fields(&self) -> impl Iterator<Item = (&String, &Document)> {
        self.fields.iter().filter(|(name, _)| !is_magic_field(name))
    }

    pub fn pre_validate(&self) -> Option<&Document> {
        self.fields.get(PRE_VALIDATE)
    }

    pub fn returned_classvars(&self) -> impl Iterator<Item = (&String, &ClassVar)> {
        self.classvars.iter().filter(|(_, cv)| cv.returned)
    }

    /// A schema with literals and no pipelines only carries configuration.
    pub fn is_literals_only(&self) -> bool {
        self.fields.is_empty() && !self.classvars.is_empty()
    }

    pub fn line_of(&self, field: &str) -> Option<usize> {
        self.field_lines.get(field).copied()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Json(#[from] PathError),
    #[error("`{schema}.{field}` step {step}: unknown method `{method}`")]
    UnknownStep { schema: String, field: String, step: usize, method: String },
    #[error("`{schema}.{field}` step {step}: {message}")]
    BadArgument { schema: String, field: String, step: usize, message: String },
    #[error("`{schema}` extends unknown schema `{parent}`")]
    UnknownParent { schema: String, parent: String },
    #[error("inheritance cycle through `{0}`")]
    Cycle(String),
    #[error("schema `{0}` is declared twice")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_types() {
        assert_eq!(literal_type(&json!("a")), VariableType::String);
        assert_eq!(literal_type(&json!(1)), VariableType::Int);
        assert_eq!(literal_type(&json!(1.5)), VariableType::Float);
        assert_eq!(literal_type(&json!(["a", "b"])), VariableType::ListString);
        assert_eq!(literal_type(&json!(null)), VariableType::Null);
        assert_eq!(literal_type(&json!({"a": 1})), VariableType::Any);
    }

    #[test]
    fn user_fields_skip_magic() {
        let s = Schema::new("Books", StructType::List)
            .field("__SPLIT_DOC__", Document::new().css_all("li"))
            .field("title", Document::new().css("h3").text());
        let names: Vec<&String> = s.user_fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["title"]);
        assert!(!s.is_literals_only());
        assert!(Schema::new("Cfg", StructType::Item).classvar("A", 1).is_literals_only());
    }
}
