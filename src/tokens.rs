//! Closed enumerations shared by the DSL, the AST and every emitter.
use std::fmt;
use serde::{Deserialize, Serialize};

// ------------------------------ Value types ------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    Document,
    ListDocument,
    String,
    ListString,
    Int,
    ListInt,
    Float,
    ListFloat,
    Bool,
    Null,
    OptionalString,
    OptionalListString,
    OptionalInt,
    OptionalListInt,
    OptionalFloat,
    OptionalListFloat,
    Nested,
    Json,
    Any,
    ListAny,
}

impl VariableType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::ListDocument => "LIST_DOCUMENT",
            Self::String => "STRING",
            Self::ListString => "LIST_STRING",
            Self::Int => "INT",
            Self::ListInt => "LIST_INT",
            Self::Float => "FLOAT",
            Self::ListFloat => "LIST_FLOAT",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::OptionalString => "OPTIONAL_STRING",
            Self::OptionalListString => "OPTIONAL_LIST_STRING",
            Self::OptionalInt => "OPTIONAL_INT",
            Self::OptionalListInt => "OPTIONAL_LIST_INT",
            Self::OptionalFloat => "OPTIONAL_FLOAT",
            Self::OptionalListFloat => "OPTIONAL_LIST_FLOAT",
            Self::Nested => "NESTED",
            Self::Json => "JSON",
            Self::Any => "ANY",
            Self::ListAny => "LIST_ANY",
        }
    }

    /// Optional counterpart used when a field falls back to `null`.
    pub fn optional(self) -> Option<Self> {
        match self {
            Self::String => Some(Self::OptionalString),
            Self::ListString => Some(Self::OptionalListString),
            Self::Int => Some(Self::OptionalInt),
            Self::ListInt => Some(Self::OptionalListInt),
            Self::Float => Some(Self::OptionalFloat),
            Self::ListFloat => Some(Self::OptionalListFloat),
            _ => None,
        }
    }

    pub fn list_item(self) -> Option<Self> {
        match self {
            Self::ListDocument => Some(Self::Document),
            Self::ListString => Some(Self::String),
            Self::ListInt => Some(Self::Int),
            Self::ListFloat => Some(Self::Float),
            Self::ListAny => Some(Self::Any),
            _ => None,
        }
    }

    pub fn is_list(self) -> bool {
        self.list_item().is_some()
    }

    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::OptionalString
                | Self::OptionalListString
                | Self::OptionalInt
                | Self::OptionalListInt
                | Self::OptionalFloat
                | Self::OptionalListFloat
        )
    }

    pub fn is_document(self) -> bool {
        matches!(self, Self::Document | Self::ListDocument)
    }

    /// Cursor admission rule for an operation accepting `self`.
    pub fn admits(self, cursor: VariableType, exclude: &[VariableType]) -> bool {
        if exclude.contains(&cursor) {
            return false;
        }
        if cursor == self || self == Self::Any {
            return true;
        }
        if self == Self::ListAny
            && matches!(
                cursor,
                Self::ListString | Self::ListInt | Self::ListFloat | Self::ListDocument
            )
        {
            return true;
        }
        matches!(cursor, Self::Any | Self::ListAny)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ------------------------------ Struct types ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructType {
    Item,
    List,
    Dict,
    FlatList,
    AccList,
    ConfigClassvars,
}

impl StructType {
    pub const ALL: [StructType; 6] = [
        Self::Item,
        Self::List,
        Self::Dict,
        Self::FlatList,
        Self::AccList,
        Self::ConfigClassvars,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Item => "ITEM",
            Self::List => "LIST",
            Self::Dict => "DICT",
            Self::FlatList => "FLAT_LIST",
            Self::AccList => "ACC_LIST",
            Self::ConfigClassvars => "CONFIG_CLASSVARS",
        }
    }

    /// Magic fields this kind cannot do without.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::List => &[SPLIT_DOC],
            Self::Dict => &[SPLIT_DOC, KEY, VALUE],
            Self::FlatList => &[SPLIT_DOC, ITEM],
            _ => &[],
        }
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------- Magic fields ------------------------------- //

pub const PRE_VALIDATE: &str = "__PRE_VALIDATE__";
pub const SPLIT_DOC: &str = "__SPLIT_DOC__";
pub const KEY: &str = "__KEY__";
pub const VALUE: &str = "__VALUE__";
pub const ITEM: &str = "__ITEM__";

pub fn is_magic_field(name: &str) -> bool {
    name.starts_with("__") && name.ends_with("__")
}

// ---------------------------- JSON value types ---------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonVariableType {
    Number,
    String,
    Float,
    Boolean,
    Null,
    Object,
    Array,
    ArrayObjects,
    ArrayNumber,
    ArrayString,
    ArrayFloat,
    ArrayBoolean,
    OptionalNumber,
    OptionalString,
    OptionalFloat,
    OptionalBoolean,
}

impl JsonVariableType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Object => "object",
            Self::Array => "array",
            Self::ArrayObjects => "array_objects",
            Self::ArrayNumber => "array_number",
            Self::ArrayString => "array_string",
            Self::ArrayFloat => "array_float",
            Self::ArrayBoolean => "array_boolean",
            Self::OptionalNumber => "optional_number",
            Self::OptionalString => "optional_string",
            Self::OptionalFloat => "optional_float",
            Self::OptionalBoolean => "optional_boolean",
        }
    }

    /// Primitive tags as written in schema files; objects are named by struct.
    pub fn from_primitive(tag: &str) -> Option<Self> {
        let ty = match tag {
            "number" => Self::Number,
            "string" => Self::String,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            "array" => Self::Array,
            "array_number" => Self::ArrayNumber,
            "array_string" => Self::ArrayString,
            "array_float" => Self::ArrayFloat,
            "array_boolean" => Self::ArrayBoolean,
            "optional_number" => Self::OptionalNumber,
            "optional_string" => Self::OptionalString,
            "optional_float" => Self::OptionalFloat,
            "optional_boolean" => Self::OptionalBoolean,
            _ => return None,
        };
        Some(ty)
    }
}

// ------------------------------- Node kinds ------------------------------- //

macro_rules! token_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TokenKind {
            $($variant),*
        }

        impl TokenKind {
            pub const ALL: &'static [TokenKind] = &[$(TokenKind::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name),*
                }
            }
        }
    };
}

token_kinds! {
    Module => "MODULE",
    Docstring => "DOCSTRING",
    Imports => "IMPORTS",
    TransformImports => "TRANSFORM_IMPORTS",
    Utilities => "UTILITIES",
    CodeStart => "CODE_START",
    CodeEnd => "CODE_END",
    JsonStruct => "JSON_STRUCT",
    JsonField => "JSON_FIELD",
    Typedef => "TYPEDEF",
    TypedefField => "TYPEDEF_FIELD",
    Struct => "STRUCT",
    Classvar => "CLASSVAR",
    StructInit => "STRUCT_INIT",
    StructPreValidate => "STRUCT_PRE_VALIDATE",
    StructPartDoc => "STRUCT_PART_DOCUMENT",
    StructField => "STRUCT_FIELD",
    StartParse => "STRUCT_PARSE_START",
    CallStructMethod => "STRUCT_CALL_FUNCTION",
    CallStructClassvar => "STRUCT_CALL_CLASSVAR",
    Default => "EXPR_DEFAULT",
    DefaultStart => "EXPR_DEFAULT_START",
    DefaultEnd => "EXPR_DEFAULT_END",
    Return => "EXPR_RETURN",
    NoReturn => "EXPR_NO_RETURN",
    Nested => "EXPR_NESTED",
    Css => "EXPR_CSS",
    CssAll => "EXPR_CSS_ALL",
    Xpath => "EXPR_XPATH",
    XpathAll => "EXPR_XPATH_ALL",
    Attr => "EXPR_ATTR",
    AttrAll => "EXPR_ATTR_ALL",
    Text => "EXPR_TEXT",
    TextAll => "EXPR_TEXT_ALL",
    Raw => "EXPR_RAW",
    RawAll => "EXPR_RAW_ALL",
    Trim => "EXPR_STRING_TRIM",
    LTrim => "EXPR_STRING_LTRIM",
    RTrim => "EXPR_STRING_RTRIM",
    ListTrim => "EXPR_LIST_STRING_TRIM",
    ListLTrim => "EXPR_LIST_STRING_LTRIM",
    ListRTrim => "EXPR_LIST_STRING_RTRIM",
    Replace => "EXPR_STRING_REPLACE",
    ListReplace => "EXPR_LIST_STRING_REPLACE",
    MapReplace => "EXPR_STRING_MAP_REPLACE",
    ListMapReplace => "EXPR_LIST_STRING_MAP_REPLACE",
    Format => "EXPR_STRING_FORMAT",
    ListFormat => "EXPR_LIST_STRING_FORMAT",
    Split => "EXPR_STRING_SPLIT",
    RmPrefix => "EXPR_STRING_RM_PREFIX",
    ListRmPrefix => "EXPR_LIST_STRING_RM_PREFIX",
    RmSuffix => "EXPR_STRING_RM_SUFFIX",
    ListRmSuffix => "EXPR_LIST_STRING_RM_SUFFIX",
    RmPrefixAndSuffix => "EXPR_STRING_RM_PREFIX_AND_SUFFIX",
    ListRmPrefixAndSuffix => "EXPR_LIST_STRING_RM_PREFIX_AND_SUFFIX",
    Unescape => "EXPR_STRING_UNESCAPE",
    ListUnescape => "EXPR_LIST_STRING_UNESCAPE",
    Regex => "EXPR_REGEX",
    RegexAll => "EXPR_REGEX_ALL",
    RegexSub => "EXPR_REGEX_SUB",
    ListRegexSub => "EXPR_LIST_REGEX_SUB",
    Index => "EXPR_LIST_ANY_INDEX",
    Join => "EXPR_LIST_JOIN",
    Len => "EXPR_LIST_LEN",
    Unique => "EXPR_LIST_UNIQUE",
    IsEqual => "IS_EQUAL",
    IsNotEqual => "IS_NOT_EQUAL",
    IsContains => "IS_CONTAINS",
    IsCss => "IS_CSS",
    IsXpath => "IS_XPATH",
    IsRegex => "IS_STRING_REGEX_MATCH",
    AnyIsRegex => "ANY_LIST_STRING_REGEX_MATCH",
    AllIsRegex => "ALL_LIST_STRING_REGEX_MATCH",
    HasAttr => "HAS_ATTR",
    ListHasAttr => "HAS_LIST_ATTR",
    ToInt => "TO_INT",
    ListToInt => "TO_INT_LIST",
    ToFloat => "TO_FLOAT",
    ListToFloat => "TO_FLOAT_LIST",
    ToBool => "TO_BOOL",
    Jsonify => "TO_JSON",
    Filter => "EXPR_FILTER",
    FilterAnd => "FILTER_AND",
    FilterOr => "FILTER_OR",
    FilterNot => "FILTER_NOT",
    FilterEq => "FILTER_EQ",
    FilterNe => "FILTER_NE",
    FilterIn => "FILTER_STR_IN",
    FilterStarts => "FILTER_STR_STARTS",
    FilterEnds => "FILTER_STR_ENDS",
    FilterRe => "FILTER_STR_RE",
    FilterLenEq => "FILTER_STR_LEN_EQ",
    FilterLenNe => "FILTER_STR_LEN_NE",
    FilterLenLt => "FILTER_STR_LEN_LT",
    FilterLenLe => "FILTER_STR_LEN_LE",
    FilterLenGt => "FILTER_STR_LEN_GT",
    FilterLenGe => "FILTER_STR_LEN_GE",
}

impl TokenKind {
    /// DSL method name as the user wrote it; used in diagnostics.
    pub fn method_name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Css => "css",
            CssAll => "css_all",
            Xpath => "xpath",
            XpathAll => "xpath_all",
            Attr | AttrAll => "attr",
            Text | TextAll => "text",
            Raw | RawAll => "raw",
            Trim | ListTrim => "trim",
            LTrim | ListLTrim => "ltrim",
            RTrim | ListRTrim => "rtrim",
            Replace | ListReplace => "replace",
            MapReplace | ListMapReplace => "map_replace",
            Format | ListFormat => "format",
            Split => "split",
            RmPrefix | ListRmPrefix => "rm_prefix",
            RmSuffix | ListRmSuffix => "rm_suffix",
            RmPrefixAndSuffix | ListRmPrefixAndSuffix => "rm_prefix_and_suffix",
            Unescape | ListUnescape => "unescape",
            Regex => "re",
            RegexAll => "re_all",
            RegexSub | ListRegexSub => "re_sub",
            Index => "index",
            Join => "join",
            Len => "to_len",
            Unique => "unique",
            IsEqual => "is_equal",
            IsNotEqual => "is_not_equal",
            IsContains => "is_contains",
            IsCss => "is_css",
            IsXpath => "is_xpath",
            IsRegex => "is_regex",
            AnyIsRegex => "any_is_regex",
            AllIsRegex => "all_is_regex",
            HasAttr | ListHasAttr => "has_attr",
            ToInt | ListToInt => "to_int",
            ToFloat | ListToFloat => "to_float",
            ToBool => "to_bool",
            Jsonify => "jsonify",
            Filter => "filter",
            Nested => "sub_parser",
            Default | DefaultStart | DefaultEnd => "default",
            FilterAnd => "and",
            FilterOr => "or",
            FilterNot => "not",
            FilterEq => "eq",
            FilterNe => "ne",
            FilterIn => "contains",
            FilterStarts => "starts_with",
            FilterEnds => "ends_with",
            FilterRe => "re",
            FilterLenEq => "len_eq",
            FilterLenNe => "len_ne",
            FilterLenLt => "len_lt",
            FilterLenLe => "len_le",
            FilterLenGt => "len_gt",
            FilterLenGe => "len_ge",
            _ => "",
        }
    }

    pub fn is_default(self) -> bool {
        matches!(self, Self::Default | Self::DefaultStart | Self::DefaultEnd)
    }

    pub fn is_css_selector(self) -> bool {
        matches!(self, Self::Css | Self::CssAll | Self::IsCss)
    }

    pub fn is_xpath_selector(self) -> bool {
        matches!(self, Self::Xpath | Self::XpathAll | Self::IsXpath)
    }

    pub fn is_filter_combinator(self) -> bool {
        matches!(self, Self::FilterAnd | Self::FilterOr | Self::FilterNot)
    }

    pub fn is_filter_predicate(self) -> bool {
        matches!(
            self,
            Self::FilterEq
                | Self::FilterNe
                | Self::FilterIn
                | Self::FilterStarts
                | Self::FilterEnds
                | Self::FilterRe
                | Self::FilterLenEq
                | Self::FilterLenNe
                | Self::FilterLenLt
                | Self::FilterLenLe
                | Self::FilterLenGt
                | Self::FilterLenGe
        )
    }

    /// Filter nodes whose fragments are joined inline into the parent filter.
    pub fn is_filter_part(self) -> bool {
        self.is_filter_combinator() || self.is_filter_predicate()
    }

    /// Assertions pass the cursor through unchanged.
    pub fn is_assertion(self) -> bool {
        matches!(
            self,
            Self::IsEqual
                | Self::IsNotEqual
                | Self::IsContains
                | Self::IsCss
                | Self::IsXpath
                | Self::IsRegex
                | Self::AnyIsRegex
                | Self::AllIsRegex
                | Self::HasAttr
                | Self::ListHasAttr
        )
    }

    pub fn is_regex(self) -> bool {
        matches!(
            self,
            Self::Regex
                | Self::RegexAll
                | Self::RegexSub
                | Self::ListRegexSub
                | Self::IsRegex
                | Self::AnyIsRegex
                | Self::AllIsRegex
                | Self::FilterRe
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_lift_covers_scalars_and_lists() {
        assert_eq!(VariableType::String.optional(), Some(VariableType::OptionalString));
        assert_eq!(VariableType::ListFloat.optional(), Some(VariableType::OptionalListFloat));
        assert_eq!(VariableType::Bool.optional(), None);
        assert_eq!(VariableType::Document.optional(), None);
    }

    #[test]
    fn wildcard_admission() {
        use VariableType::*;
        assert!(Document.admits(Document, &[]));
        assert!(!String.admits(Document, &[]));
        assert!(Any.admits(Int, &[]));
        assert!(!Any.admits(Document, &[Document]));
        assert!(ListAny.admits(ListString, &[]));
        assert!(ListAny.admits(ListDocument, &[]));
        assert!(!ListAny.admits(String, &[]));
        assert!(String.admits(Any, &[]));
    }

    #[test]
    fn kind_names_are_unique() {
        let mut names: Vec<&str> = TokenKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn struct_kind_requirements() {
        assert_eq!(StructType::Dict.required_fields(), &[SPLIT_DOC, KEY, VALUE]);
        assert!(StructType::Item.required_fields().is_empty());
        assert!(is_magic_field("__KEY__"));
        assert!(!is_magic_field("title"));
    }
}
