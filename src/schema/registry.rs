//! Explicit schema registry and inheritance merge.
use std::collections::HashSet;

use indexmap::IndexMap;

use super::{JsonStruct, LoadError, Schema};
use crate::tokens::StructType;

/// Source text the schemas were loaded from, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    pub docstring: Option<String>,
    pub source: Option<SourceFile>,
    schemas: IndexMap<String, Schema>,
    json_structs: IndexMap<String, JsonStruct>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the schema produced by `build` under `name`.
    pub fn register(&mut self, name: &str, build: impl FnOnce() -> Schema) -> Result<&mut Self, LoadError> {
        let mut schema = build();
        schema.name = name.to_string();
        self.insert(schema)
    }

    pub fn insert(&mut self, schema: Schema) -> Result<&mut Self, LoadError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(LoadError::Duplicate(schema.name));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(self)
    }

    pub fn insert_json_struct(&mut self, st: JsonStruct) -> &mut Self {
        self.json_structs.insert(st.name.clone(), st);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn json_struct(&self, name: &str) -> Option<&JsonStruct> {
        self.json_structs.get(name)
    }

    pub fn json_structs(&self) -> impl Iterator<Item = &JsonStruct> {
        self.json_structs.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schemas with parents merged in, in registration order.
    ///
    /// Parents are merged left to right before the child; later entries win
    /// and keep the position of the first declaration. Literal-only ITEM
    /// schemas become CONFIG_CLASSVARS.
    pub fn resolved(&self) -> Result<Vec<Schema>, LoadError> {
        let mut out = Vec::with_capacity(self.schemas.len());
        for schema in self.schemas.values() {
            let mut visiting = HashSet::new();
            let mut merged = self.merge(schema, &mut visiting)?;
            if merged.kind == StructType::Item && merged.is_literals_only() {
                merged.kind = StructType::ConfigClassvars;
            }
            out.push(merged);
        }
        Ok(out)
    }

    fn merge(&self, schema: &Schema, visiting: &mut HashSet<String>) -> Result<Schema, LoadError> {
        if !visiting.insert(schema.name.clone()) {
            return Err(LoadError::Cycle(schema.name.clone()));
        }
        let mut merged = Schema::new(&schema.name, schema.kind);
        for parent_name in &schema.extends {
            let parent = self.schemas.get(parent_name).ok_or_else(|| LoadError::UnknownParent {
                schema: schema.name.clone(),
                parent: parent_name.clone(),
            })?;
            let parent = self.merge(parent, visiting)?;
            log::debug!("{}: inherit {} field(s) from {}", schema.name, parent.fields.len(), parent.name);
            merged.classvars.extend(parent.classvars);
            merged.fields.extend(parent.fields);
            merged.field_lines.extend(parent.field_lines);
            if merged.doc.is_empty() {
                merged.doc = parent.doc;
            }
        }
        merged.classvars.extend(schema.classvars.clone());
        merged.fields.extend(schema.fields.clone());
        merged.field_lines.extend(schema.field_lines.clone());
        if !schema.doc.is_empty() {
            merged.doc = schema.doc.clone();
        }
        merged.extends = schema.extends.clone();
        visiting.remove(&schema.name);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn base() -> Schema {
        Schema::new("Base", StructType::Item)
            .classvar("URL", "https://a.test")
            .field("title", Document::new().css("h1").text())
            .field("price", Document::new().css(".p").text())
    }

    #[test]
    fn children_win_and_keep_parent_order() {
        let mut reg = SchemaRegistry::new();
        reg.register("Base", base).unwrap();
        reg.insert(
            Schema::new("Child", StructType::Item)
                .extends("Base")
                .classvar("URL", "https://b.test")
                .field("price", Document::new().css(".price").text().to_float())
                .field("sku", Document::new().css(".sku").text()),
        )
        .unwrap();
        let resolved = reg.resolved().unwrap();
        let child = &resolved[1];
        let names: Vec<&str> = child.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "price", "sku"]);
        assert_eq!(child.fields["price"].stack().len(), 3);
        assert_eq!(child.classvars["URL"].value, "https://b.test");
    }

    #[test]
    fn unknown_parent_and_cycles() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("A", StructType::Item).extends("Nope")).unwrap();
        assert!(matches!(reg.resolved(), Err(LoadError::UnknownParent { .. })));

        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("A", StructType::Item).extends("B")).unwrap();
        reg.insert(Schema::new("B", StructType::Item).extends("A")).unwrap();
        assert!(matches!(reg.resolved(), Err(LoadError::Cycle(_))));
    }

    #[test]
    fn duplicates_rejected() {
        let mut reg = SchemaRegistry::new();
        reg.register("Base", base).unwrap();
        assert!(matches!(reg.register("Base", base), Err(LoadError::Duplicate(_))));
    }

    #[test]
    fn literal_only_item_becomes_config() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("Cfg", StructType::Item).classvar("A", 1)).unwrap();
        assert_eq!(reg.resolved().unwrap()[0].kind, StructType::ConfigClassvars);
    }
}
