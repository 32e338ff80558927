//! Smart-tag registry.
//!
//! A smart tag is a named operator with a default [`Mode`], an [`InitKind`]
//! seeding its own fold, two type checks and a function. Registration is
//! instance-local: every [`SmartTags`] starts with the built-ins and hosts
//! can add or replace tags on their own copy.

mod arithmetic;
mod coercion;
mod collections;
mod introspection;
mod logic;
mod records;
mod references;
pub mod selector;
mod strings;
mod structural;

pub(crate) use records::lookup_path;

use crate::error::EvalError;
use crate::transformer::{Call, Mode};
use crate::tree::Context;
use crate::typecheck::{
    ArgsMismatch, Kind, TEXTUAL, TypeMismatch, type_check, type_check_many, type_check_rest,
};
use crate::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type MainCheck = fn(Value) -> Result<Value, TypeMismatch>;
pub type ArgsCheck = fn(Vec<Value>, &Value) -> Result<Vec<Value>, ArgsMismatch>;
pub type TagFn = fn(Value, Vec<Value>, &mut Context, &Call) -> Result<Value, EvalError>;

/// Seed of a smart tag's own fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitKind {
    Array,
    Boolean,
    Number,
    String,
    Text,
    NodeList,
    Null,
    Record,
}

impl InitKind {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim().to_ascii_lowercase().as_str() {
            "array" => InitKind::Array,
            "boolean" => InitKind::Boolean,
            "number" => InitKind::Number,
            "string" => InitKind::String,
            "text" => InitKind::Text,
            "nodelist" => InitKind::NodeList,
            "null" => InitKind::Null,
            "record" => InitKind::Record,
            _ => return None,
        })
    }

    pub fn seed(self) -> Value {
        match self {
            InitKind::Array => Value::Array(Vec::new()),
            InitKind::Boolean => Value::Boolean(false),
            InitKind::Number => Value::Number(0.0),
            InitKind::String => Value::String(String::new()),
            InitKind::Text => Value::Text(String::new()),
            InitKind::NodeList => Value::NodeFragment(Vec::new()),
            InitKind::Null => Value::Null,
            InitKind::Record => Value::Record(Record::new()),
        }
    }
}

#[derive(Clone, Copy)]
pub struct SmartTag {
    pub default_mode: Mode,
    pub init: InitKind,
    pub main_check: MainCheck,
    pub args_check: ArgsCheck,
    pub func: TagFn,
}

impl fmt::Debug for SmartTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartTag")
            .field("default_mode", &self.default_mode)
            .field("init", &self.init)
            .finish_non_exhaustive()
    }
}

impl SmartTag {
    /// Coalescion tag seeded with an empty array.
    pub fn coalescion(main_check: MainCheck, args_check: ArgsCheck, func: TagFn) -> Self {
        Self {
            default_mode: Mode::Coalescion,
            init: InitKind::Array,
            main_check,
            args_check,
            func,
        }
    }

    /// Isolation tag seeded with an empty array.
    pub fn isolation(main_check: MainCheck, args_check: ArgsCheck, func: TagFn) -> Self {
        Self {
            default_mode: Mode::Isolation,
            ..Self::coalescion(main_check, args_check, func)
        }
    }

    pub fn with_init(mut self, init: InitKind) -> Self {
        self.init = init;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SmartTags {
    tags: HashMap<String, SmartTag>,
}

impl SmartTags {
    /// Registry preloaded with the built-in tags.
    pub fn new() -> Self {
        use SmartTag as T;
        let mut tags: HashMap<String, SmartTag> = HashMap::new();
        tags.insert("add".into(), T::coalescion(arithmetic::main_number, arithmetic::args_numbers, arithmetic::add));
        tags.insert("and".into(), T::coalescion(main_any, args_any, logic::and));
        tags.insert("or".into(), T::coalescion(main_any, args_any, logic::or));
        tags.insert("negate".into(), T::coalescion(logic::main_negatable, args_none, logic::negate));
        tags.insert("if".into(), T::coalescion(main_any, logic::args_if, logic::if_));
        tags.insert("equals".into(), T::coalescion(main_any, args_some, logic::equals));
        tags.insert("join".into(), T::coalescion(main_array, strings::args_join, strings::join));
        tags.insert("split".into(), T::coalescion(main_textual, args_one_textual, strings::split));
        tags.insert("replace".into(), T::coalescion(main_textual, strings::args_replace, strings::replace));
        tags.insert("trim".into(), T::coalescion(main_textual, args_none, strings::trim));
        tags.insert("notrailing".into(), T::coalescion(main_textual, args_optional_textual, strings::notrailing));
        tags.insert("populate".into(), T::coalescion(main_textual, strings::args_populate, strings::populate).with_init(InitKind::Record));
        tags.insert("push".into(), T::coalescion(main_array, args_some, collections::push));
        tags.insert("pusheach".into(), T::coalescion(main_array, collections::args_arrays, collections::push_each));
        tags.insert("map".into(), T::coalescion(main_array, args_method, collections::map));
        tags.insert("at".into(), T::coalescion(collections::main_indexable, collections::args_index, collections::at));
        tags.insert("sorton".into(), T::coalescion(collections::main_records, args_textual_rest, collections::sort_on));
        tags.insert("pickrandom".into(), T::coalescion(main_array, args_none, collections::pick_random));
        tags.insert("recordtoarray".into(), T::coalescion(main_record, args_none, collections::record_to_array));
        tags.insert("length".into(), T::coalescion(collections::main_sized, args_none, collections::length));
        tags.insert("getproperty".into(), T::coalescion(main_record, args_one_textual, records::get_property));
        tags.insert("setproperty".into(), T::coalescion(main_record, records::args_set_property, records::set_property));
        tags.insert("deleteproperties".into(), T::coalescion(main_record, args_textual_rest, records::delete_properties));
        tags.insert("getproperties".into(), T::coalescion(main_record, args_textual_rest, records::get_properties));
        tags.insert("setproperties".into(), T::coalescion(main_record, records::args_one_record, records::set_properties).with_init(InitKind::Record));
        tags.insert("renameproperty".into(), T::coalescion(main_record, records::args_rename, records::rename_property));
        tags.insert("element".into(), T::isolation(main_textual, args_any, structural::element));
        tags.insert("setattribute".into(), T::coalescion(main_element, structural::args_set_attribute, structural::set_attribute));
        tags.insert("removeattribute".into(), T::coalescion(main_element, args_textual_rest, structural::remove_attribute));
        tags.insert("addclass".into(), T::coalescion(main_element, args_textual_rest, structural::add_class));
        tags.insert("removeclass".into(), T::coalescion(main_element, args_textual_rest, structural::remove_class));
        tags.insert("toggleclass".into(), T::coalescion(main_element, args_textual_rest, structural::toggle_class));
        tags.insert("getattribute".into(), T::coalescion(main_element, args_one_textual, structural::get_attribute));
        tags.insert("select".into(), T::coalescion(main_nodes, args_one_textual, structural::select));
        tags.insert("transformselected".into(), T::coalescion(main_nodes, structural::args_transform_selected, structural::transform_selected));
        tags.insert("append".into(), T::coalescion(structural::main_appendable, args_some, structural::append));
        tags.insert("ref".into(), T::isolation(main_textual, args_none, references::reference));
        tags.insert("toref".into(), T::coalescion(main_textual, args_none, references::reference));
        tags.insert("get".into(), T::isolation(main_textual, args_none, references::get));
        tags.insert("set".into(), T::coalescion(main_any, args_one_textual, references::set));
        tags.insert("global".into(), T::isolation(main_textual, args_none, references::global));
        tags.insert("toboolean".into(), T::coalescion(main_any, args_none, coercion::to_boolean));
        tags.insert("tonumber".into(), T::coalescion(main_any, args_none, coercion::to_number));
        tags.insert("tostring".into(), T::coalescion(main_any, args_none, coercion::to_string));
        tags.insert("totext".into(), T::coalescion(main_any, args_none, coercion::to_text));
        tags.insert("tonodelist".into(), T::coalescion(main_any, args_none, coercion::to_nodelist));
        tags.insert("torecord".into(), T::coalescion(main_any, args_none, coercion::to_record));
        tags.insert("tonull".into(), T::coalescion(main_any, args_none, coercion::to_null));
        tags.insert("toarray".into(), T::coalescion(main_any, args_none, coercion::to_array));
        tags.insert("print".into(), T::coalescion(main_any, args_any, introspection::print));
        tags.insert("clone".into(), T::coalescion(main_any, args_none, introspection::clone));
        tags.insert("initialize".into(), T::coalescion(main_any, args_optional_textual, introspection::initialize));
        tags.insert("guess".into(), T::coalescion(main_textual, args_none, introspection::guess));
        Self { tags }
    }

    /// Registry without any tag.
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Looks up a tag by its lowercase name.
    pub fn get(&self, name: &str) -> Option<SmartTag> {
        self.tags.get(name).copied()
    }

    /// Registers or replaces a tag; the name is stored lowercase.
    pub fn register(&mut self, name: impl Into<String>, tag: SmartTag) -> Option<SmartTag> {
        self.tags.insert(name.into().to_ascii_lowercase(), tag)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

impl Default for SmartTags {
    fn default() -> Self {
        Self::new()
    }
}

// Checks shared by several tags, also usable by host-registered tags.

pub fn main_any(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::Any])
}

pub fn main_textual(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, TEXTUAL)
}

pub fn main_array(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::ANY_ARRAY])
}

pub fn main_record(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::ANY_RECORD])
}

pub fn main_element(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::Element])
}

pub fn main_nodes(value: Value) -> Result<Value, TypeMismatch> {
    type_check(value, &[Kind::Element, Kind::NodeList])
}

pub fn args_none(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[])
}

pub fn args_any(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_rest(args, 0, &[Kind::Any])
}

pub fn args_some(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_rest(args, 1, &[Kind::Any])
}

pub fn args_one_textual(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[TEXTUAL])
}

pub fn args_optional_textual(
    args: Vec<Value>,
    _main: &Value,
) -> Result<Vec<Value>, ArgsMismatch> {
    crate::typecheck::type_check_between(args, 0, &[TEXTUAL])
}

pub fn args_textual_rest(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_rest(args, 1, TEXTUAL)
}

pub fn args_method(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[&[Kind::Method]])
}

/// Rebuilds a textual result with the same kind as `like`.
pub(crate) fn same_textual(like: &Value, content: String) -> Value {
    match like {
        Value::Text(_) => Value::Text(content),
        _ => Value::String(content),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_is_instance_local() {
        let mut custom = SmartTags::new();
        let previous = custom.register(
            "Double",
            SmartTag::coalescion(main_any, args_none, |main, _, _, _| {
                Ok(Value::Number(main.as_f64().unwrap_or(0.0) * 2.0))
            }),
        );
        assert!(previous.is_none());
        assert!(custom.contains("double"));
        assert!(!SmartTags::new().contains("double"));
        assert!(SmartTags::empty().get("add").is_none());
        assert_eq!(SmartTags::new().get("ref").map(|t| t.default_mode), Some(Mode::Isolation));
    }

    #[test]
    fn init_kind_seeds_fold() {
        assert_eq!(InitKind::parse("NodeList"), Some(InitKind::NodeList));
        assert_eq!(InitKind::Record.seed(), Value::Record(Record::new()));
        assert_eq!(SmartTags::new().get("populate").map(|t| t.init), Some(InitKind::Record));
    }

    #[test]
    fn coalescion_splits_outer_and_captured() {
        let out = coalesce("add", Value::Number(3.0), vec![Value::Number(4.0), Value::Number(5.0)]);
        assert_eq!(out, Ok(Value::Number(12.0)));
    }

    #[test]
    fn isolation_takes_first_captured_as_main() {
        let out = apply_tag(
            "add",
            Mode::Isolation,
            Value::Null,
            Value::from(json!([1, 2, 3])),
        );
        assert_eq!(out, Ok(Value::Number(6.0)));
    }

    #[test]
    fn main_mismatch_is_reported() {
        let err = coalesce("trim", Value::Number(1.0), vec![]).expect_err("mismatch");
        assert_eq!(err.code(), "HYPERJSON_E_MAIN_VALUE");
    }

    #[test]
    fn custom_tag_used_by_tree() {
        let mut tags = SmartTags::new();
        tags.register(
            "double",
            SmartTag::coalescion(main_any, args_none, |main, _, _, _| {
                Ok(Value::Number(main.as_f64().unwrap_or(0.0) * 2.0))
            }),
        );
        let node = serde_json::from_value(json!({"tag": "number", "children": [
            {"tag": "number", "children": ["21"]},
            {"tag": "double"}
        ]}))
        .expect("document");
        let mut tree = crate::tree::Tree::build(&node, tags, crate::config::Options::default());
        assert_eq!(tree.evaluate(), Ok(Value::Number(42.0)));
        assert_eq!(
            eval(json!({"tag": "number", "children": [{"tag": "double"}]})),
            Ok(Value::Number(0.0))
        );
    }
}
