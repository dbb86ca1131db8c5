//! Least-upper-bound inference of JSON struct declarations.
//!
//! Samples are observed into a summary `U` that holds at most one arm per
//! JSON kind, and merged with [`join`]. Join is associative and commutative, so
//! the result never depends on sample order; only field order follows first
//! appearance. [`declare`] then walks the merged summary and
//! produces the [`JsonStruct`] declarations a `jsonify` step reads, nested
//! structs ahead of the structs that reference them.
pub mod num;
pub mod str;

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{JsonFieldType, JsonStruct};
use crate::str_utils::to_upper_camel_case;
use crate::tokens::JsonVariableType;

pub use num::NumC;
pub use str::StrC;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferError {
    #[error("no JSON samples")]
    NoSamples,
    #[error("expected an object or an array of objects at the top level, got {found}")]
    NotAnObject { found: String },
    #[error("bad json key `{key}` at {path}: keys must start with a letter or `_`")]
    BadKey { path: String, key: String },
    #[error("bad struct name `{0}`")]
    BadName(String),
}

static KEY_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_a-zA-Z]").expect("valid key regex"));

// ------------------------------ State (LUB) ------------------------------- //

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct U {
    pub nullable: bool,
    pub has_bool: bool,
    pub num: Option<NumC>,
    pub str_: Option<StrC>,
    pub arr: Option<ArrC>,
    pub obj: Option<ObjC>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrC {
    pub len_min: u32,
    pub len_max: u32,
    pub item: Box<U>,
    pub samples: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjC {
    pub fields: IndexMap<String, FieldC>,
    pub seen_objects: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldC {
    pub ty: U,
    pub present_in: u64,
    /// Objects where the key was present and not null.
    pub non_null_in: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    Obj,
    Arr,
    Str,
    Num,
    Bool,
}

impl Arm {
    fn name(self) -> &'static str {
        match self {
            Self::Obj => "object",
            Self::Arr => "array",
            Self::Str => "string",
            Self::Num => "number",
            Self::Bool => "boolean",
        }
    }
}

impl U {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_bottom(&self) -> bool {
        !self.nullable && self.arms().is_empty()
    }

    /// Non-null arms in fallback preference order.
    fn arms(&self) -> Vec<Arm> {
        let mut arms = Vec::new();
        if self.obj.is_some() {
            arms.push(Arm::Obj);
        }
        if self.arr.is_some() {
            arms.push(Arm::Arr);
        }
        if self.str_.is_some() {
            arms.push(Arm::Str);
        }
        if self.num.is_some() {
            arms.push(Arm::Num);
        }
        if self.has_bool {
            arms.push(Arm::Bool);
        }
        arms
    }

    /// Copy keeping only `arm` and nullability.
    fn only(&self, arm: Arm) -> Self {
        Self {
            nullable: self.nullable,
            has_bool: arm == Arm::Bool && self.has_bool,
            num: self.num.clone().filter(|_| arm == Arm::Num),
            str_: self.str_.clone().filter(|_| arm == Arm::Str),
            arr: self.arr.clone().filter(|_| arm == Arm::Arr),
            obj: self.obj.clone().filter(|_| arm == Arm::Obj),
        }
    }

    fn describe(&self) -> String {
        let mut names: Vec<&str> = self.arms().iter().map(|a| a.name()).collect();
        if self.nullable {
            names.push("null");
        }
        if names.is_empty() { "nothing".into() } else { names.join(" | ") }
    }
}

// ------------------------------ Observe ---------------------------------- //

pub fn observe_value(v: &Value) -> U {
    match v {
        Value::Null => U { nullable: true, ..U::default() },
        Value::Bool(_) => U { has_bool: true, ..U::default() },
        Value::Number(n) => U { num: Some(NumC::observe(n)), ..U::default() },
        Value::String(s) => U { str_: Some(StrC::observe(s)), ..U::default() },
        Value::Array(xs) => observe_array(xs),
        Value::Object(m) => observe_object(m),
    }
}

fn observe_array(xs: &[Value]) -> U {
    let len = xs.len() as u32;
    let item = xs.iter().fold(U::empty(), |acc, el| join(&acc, &observe_value(el)));
    let arr = ArrC { len_min: len, len_max: len, item: Box::new(item), samples: 1 };
    U { arr: Some(arr), ..U::default() }
}

fn observe_object(map: &Map<String, Value>) -> U {
    let fields = map
        .iter()
        .map(|(k, v)| {
            let field = FieldC {
                ty: observe_value(v),
                present_in: 1,
                non_null_in: u64::from(!v.is_null()),
            };
            (k.clone(), field)
        })
        .collect();
    U { obj: Some(ObjC { fields, seen_objects: 1 }), ..U::default() }
}

// -------------------------------- Join (⊔) -------------------------------- //

fn join_opt<T: Clone>(a: &Option<T>, b: &Option<T>, f: impl Fn(&T, &T) -> T) -> Option<T> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => Some(f(x, y)),
    }
}

pub fn join(a: &U, b: &U) -> U {
    U {
        nullable: a.nullable || b.nullable,
        has_bool: a.has_bool || b.has_bool,
        num: join_opt(&a.num, &b.num, NumC::join),
        str_: join_opt(&a.str_, &b.str_, str::join_str),
        arr: join_opt(&a.arr, &b.arr, join_arr),
        obj: join_opt(&a.obj, &b.obj, join_obj),
    }
}

fn join_arr(a: &ArrC, b: &ArrC) -> ArrC {
    ArrC {
        len_min: a.len_min.min(b.len_min),
        len_max: a.len_max.max(b.len_max),
        item: Box::new(join(&a.item, &b.item)),
        samples: a.samples + b.samples,
    }
}

fn join_obj(a: &ObjC, b: &ObjC) -> ObjC {
    let mut fields = a.fields.clone();
    for (k, fb) in &b.fields {
        match fields.get_mut(k) {
            Some(fa) => {
                fa.ty = join(&fa.ty, &fb.ty);
                fa.present_in += fb.present_in;
                fa.non_null_in += fb.non_null_in;
            }
            None => {
                fields.insert(k.clone(), fb.clone());
            }
        }
    }
    ObjC { fields, seen_objects: a.seen_objects + b.seen_objects }
}

// ------------------------------- Streaming -------------------------------- //

#[derive(Debug, Default)]
pub struct Inference {
    state: U,
    samples: u64,
}

impl Inference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_value(&mut self, v: &Value) {
        self.state = join(&self.state, &observe_value(v));
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn solve(&self) -> &U {
        &self.state
    }
}

pub fn infer_from_values<'a, I>(values: I) -> U
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut inf = Inference::new();
    for v in values {
        inf.observe_value(v);
    }
    inf.state
}

/// Observe every sample and declare the structs rooted at `root_name`.
pub fn infer_json_structs(root_name: &str, samples: &[Value]) -> Result<Vec<JsonStruct>, InferError> {
    if samples.is_empty() {
        return Err(InferError::NoSamples);
    }
    let u = infer_from_values(samples);
    log::debug!("observed {} sample(s)", samples.len());
    declare(root_name, &u)
}

// ------------------------------ Declaration ------------------------------- //

/// Turn a merged summary into struct declarations.
///
/// The top level must be an object, or an array of objects (declared with
/// `is_array`). Keys missing from some objects or null in some samples become
/// `optional_*` primitives.
pub fn declare(root_name: &str, u: &U) -> Result<Vec<JsonStruct>, InferError> {
    let name = to_upper_camel_case(root_name);
    if name.is_empty() || !KEY_START.is_match(&name) {
        return Err(InferError::BadName(root_name.to_string()));
    }
    let not_object = || InferError::NotAnObject { found: u.describe() };
    let (obj, is_array) = match (u.arms().as_slice(), &u.obj, &u.arr) {
        ([Arm::Obj], Some(obj), _) => (obj, false),
        ([Arm::Arr], _, Some(arr)) => match (arr.item.arms().as_slice(), &arr.item.obj) {
            ([Arm::Obj], Some(obj)) => (obj, true),
            _ => return Err(not_object()),
        },
        _ => return Err(not_object()),
    };
    let mut declarer = Declarer::default();
    declarer.taken.insert(name.clone());
    declarer.declare_struct(&name, obj, is_array, "$")?;
    Ok(declarer.structs)
}

#[derive(Default)]
struct Declarer {
    structs: Vec<JsonStruct>,
    taken: HashSet<String>,
}

impl Declarer {
    fn unique_name(&mut self, key: &str) -> String {
        let mut base = to_upper_camel_case(key);
        if base.is_empty() {
            base = "Struct".into();
        }
        let mut name = base.clone();
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{base}{n}");
            n += 1;
        }
        self.taken.insert(name.clone());
        name
    }

    fn declare_struct(&mut self, name: &str, obj: &ObjC, is_array: bool, path: &str) -> Result<(), InferError> {
        let mut st = JsonStruct::new(name, is_array);
        for (key, field) in &obj.fields {
            let field_path = format!("{path}.{key}");
            if !KEY_START.is_match(key) {
                return Err(InferError::BadKey { path: field_path, key: key.clone() });
            }
            let optional = field.non_null_in < obj.seen_objects;
            let ty = self.field_type(name, key, &field.ty, optional, &field_path)?;
            match &field.ty.str_ {
                Some(s) if s.is_uri => log::debug!("{name}.{key} = {} (uri)", ty.tag()),
                _ => log::debug!("{name}.{key} = {}", ty.tag()),
            }
            st.fields.insert(key.clone(), ty);
        }
        self.structs.push(st);
        Ok(())
    }

    fn field_type(&mut self, owner: &str, key: &str, u: &U, optional: bool, path: &str) -> Result<JsonFieldType, InferError> {
        match (u.arms().as_slice(), &u.obj, &u.arr) {
            ([], _, _) => Ok(JsonFieldType::Primitive(JsonVariableType::Null)),
            ([Arm::Obj], Some(obj), _) => {
                let name = self.unique_name(key);
                self.declare_struct(&name, obj, false, path)?;
                Ok(JsonFieldType::Object(name))
            }
            ([Arm::Arr], _, Some(arr)) => self.array_type(owner, key, arr, path),
            ([arm], _, _) => Ok(JsonFieldType::Primitive(primitive(*arm, u, optional))),
            ([first, ..], _, _) => {
                log::warn!("`{owner}.{key}` holds {}; declaring it as {}", u.describe(), first.name());
                self.field_type(owner, key, &u.only(*first), optional, path)
            }
        }
    }

    fn array_type(&mut self, owner: &str, key: &str, arr: &ArrC, path: &str) -> Result<JsonFieldType, InferError> {
        let item = &arr.item;
        let ty = match (item.arms().as_slice(), &item.obj) {
            ([], _) => {
                log::warn!("`{owner}.{key}` only held empty arrays; declaring array_string, check it by hand");
                JsonVariableType::ArrayString
            }
            ([Arm::Obj], Some(obj)) => {
                let name = self.unique_name(key);
                self.declare_struct(&name, obj, false, &format!("{path}[]"))?;
                return Ok(JsonFieldType::ArrayObjects(name));
            }
            ([Arm::Str], _) => JsonVariableType::ArrayString,
            ([Arm::Bool], _) => JsonVariableType::ArrayBoolean,
            ([Arm::Num], _) => match &item.num {
                Some(n) if !n.is_integer() => JsonVariableType::ArrayFloat,
                _ => JsonVariableType::ArrayNumber,
            },
            ([Arm::Arr], _) => JsonVariableType::Array,
            _ => {
                log::warn!("`{owner}.{key}` items hold {}; declaring a plain array", item.describe());
                JsonVariableType::Array
            }
        };
        Ok(JsonFieldType::Primitive(ty))
    }
}

fn primitive(arm: Arm, u: &U, optional: bool) -> JsonVariableType {
    use JsonVariableType as T;
    let float = u.num.as_ref().is_some_and(|n| !n.is_integer());
    match (arm, optional, float) {
        (Arm::Bool, false, _) => T::Boolean,
        (Arm::Bool, true, _) => T::OptionalBoolean,
        (Arm::Num, false, false) => T::Number,
        (Arm::Num, true, false) => T::OptionalNumber,
        (Arm::Num, false, true) => T::Float,
        (Arm::Num, true, true) => T::OptionalFloat,
        (_, false, _) => T::String,
        (_, true, _) => T::OptionalString,
    }
}

// ------------------------------- Emission --------------------------------- //

/// Declarations in the `json_structs` section format of a schema file.
pub fn to_schema_file(structs: &[JsonStruct]) -> Value {
    let decls: Vec<Value> = structs
        .iter()
        .map(|st| {
            let mut decl = Map::new();
            decl.insert("name".into(), Value::String(st.name.clone()));
            if st.is_array {
                decl.insert("is_array".into(), Value::Bool(true));
            }
            let fields: Map<String, Value> =
                st.fields.iter().map(|(k, ty)| (k.clone(), Value::String(ty.tag()))).collect();
            decl.insert("fields".into(), Value::Object(fields));
            Value::Object(decl)
        })
        .collect();
    let mut file = Map::new();
    file.insert("json_structs".into(), Value::Array(decls));
    Value::Object(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(st: &JsonStruct) -> Vec<(String, String)> {
        st.fields.iter().map(|(k, ty)| (k.clone(), ty.tag())).collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn missing_and_null_fields_become_optional() {
        let samples = vec![
            json!({"id": 1, "name": "a", "tags": ["x"], "ok": true}),
            json!({"id": 2, "name": null, "tags": [], "ok": false, "score": 1.5}),
        ];
        let structs = infer_json_structs("root", &samples).unwrap();
        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].name, "Root");
        assert_eq!(
            tags(&structs[0]),
            pairs(&[
                ("id", "number"),
                ("name", "optional_string"),
                ("tags", "array_string"),
                ("ok", "boolean"),
                ("score", "optional_float"),
            ])
        );
    }

    #[test]
    fn nested_structs_come_first() {
        let samples = vec![json!({
            "author": {"name": "x"},
            "items": [{"sku": "a", "price": 1.5}, {"sku": "b", "price": 2}]
        })];
        let structs = infer_json_structs("Content", &samples).unwrap();
        let names: Vec<&str> = structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Author", "Items", "Content"]);
        assert_eq!(tags(&structs[1]), pairs(&[("sku", "string"), ("price", "float")]));
        assert_eq!(tags(&structs[2]), pairs(&[("author", "Author"), ("items", "[Items]")]));
    }

    #[test]
    fn top_level_array_sets_is_array() {
        let samples = vec![json!([{"id": 1}, {"id": 2, "url": "https://x.test"}])];
        let structs = infer_json_structs("quotes", &samples).unwrap();
        assert!(structs[0].is_array);
        assert_eq!(tags(&structs[0]), pairs(&[("id", "number"), ("url", "optional_string")]));
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let samples = vec![json!({"a": {"meta": {"x": 1}}, "b": {"meta": {"y": "s"}}})];
        let structs = infer_json_structs("Root", &samples).unwrap();
        let names: Vec<&str> = structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Meta", "A", "Meta2", "B", "Root"]);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(infer_json_structs("Root", &[]), Err(InferError::NoSamples));
        assert_eq!(
            infer_json_structs("Root", &[json!([1, 2])]),
            Err(InferError::NotAnObject { found: "array".into() })
        );
        assert_eq!(
            infer_json_structs("Root", &[json!({"a": {"1st": 1}})]),
            Err(InferError::BadKey { path: "$.a.1st".into(), key: "1st".into() })
        );
        assert_eq!(infer_json_structs("9lives", &[json!({})]), Err(InferError::BadName("9lives".into())));
    }

    #[test]
    fn mixed_kinds_fall_back() {
        let samples = vec![json!({"v": 1, "xs": [1, "a"]}), json!({"v": "a", "xs": []})];
        let structs = infer_json_structs("Root", &samples).unwrap();
        assert_eq!(tags(&structs[0]), pairs(&[("v", "string"), ("xs", "array")]));
    }

    #[test]
    fn join_is_commutative_and_associative() {
        let a = observe_value(&json!({"x": 1, "y": [1.5], "z": null}));
        let b = observe_value(&json!({"x": "s", "w": {"k": true}}));
        let c = observe_value(&json!([{"x": 2}]));
        assert_eq!(join(&a, &b), join(&b, &a));
        assert_eq!(join(&join(&a, &b), &c), join(&a, &join(&b, &c)));
        assert!(U::empty().is_bottom());
    }

    #[test]
    fn schema_file_loads_back() {
        let samples = vec![json!({"title": "t", "tags": [{"name": "n"}]})];
        let structs = infer_json_structs("Meta", &samples).unwrap();
        let text = to_schema_file(&structs).to_string();
        let registry = crate::schema::loader::load_str(&text).unwrap();
        assert_eq!(registry.json_struct("Meta"), structs.last());
        assert_eq!(registry.json_struct("Tags"), structs.first());
    }
}
