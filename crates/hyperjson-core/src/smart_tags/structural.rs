use super::same_textual;
use super::selector::Selector;
use crate::cast;
use crate::error::EvalError;
use crate::node::{Attributes, Element, Node};
use crate::transformer::{Call, Method};
use crate::tree::Context;
use crate::typecheck::{
    ArgsMismatch, Kind, TEXTUAL, TypeMismatch, type_check, type_check_between, type_check_many,
};
use crate::value::Value;

const ATTRIBUTE_VALUE: &[Kind] = &[Kind::String, Kind::Text, Kind::Number, Kind::Boolean];

pub(super) fn main_appendable(value: Value) -> Result<Value, TypeMismatch> {
    type_check(
        value,
        &[
            Kind::Element,
            Kind::NodeList,
            Kind::ANY_ARRAY,
            Kind::String,
            Kind::Text,
        ],
    )
}

pub(super) fn args_set_attribute(args: Vec<Value>, _main: &Value) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_between(args, 1, &[TEXTUAL, ATTRIBUTE_VALUE])
}

pub(super) fn args_transform_selected(
    args: Vec<Value>,
    _main: &Value,
) -> Result<Vec<Value>, ArgsMismatch> {
    type_check_many(args, &[TEXTUAL, &[Kind::Method]])
}

fn into_element(main: Value) -> Element {
    match main {
        Value::Structural(el) => el,
        _ => Element::new(""),
    }
}

/// Whitespace-separated class names across all arguments.
fn class_names(args: &[Value]) -> Vec<String> {
    args.iter()
        .filter_map(Value::as_str)
        .flat_map(str::split_whitespace)
        .map(String::from)
        .collect()
}

fn parse_selector(raw: Option<&Value>, call: &Call) -> Result<Selector, EvalError> {
    let raw = raw.and_then(Value::as_str).unwrap_or_default();
    Selector::parse(raw).map_err(|details| call.fail(details))
}

/// Builds an element: record arguments become attributes, anything else
/// becomes children.
pub(super) fn element(main: Value, args: Vec<Value>, ctx: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let tag = main.as_str().unwrap_or_default().trim();
    if tag.is_empty() {
        return Err(call.fail("element name is empty"));
    }
    let mut attributes = Attributes::new();
    let mut children = Vec::new();
    for arg in args {
        match arg {
            Value::Record(record) => {
                for (name, value) in record {
                    attributes.insert(name, cast::to_string(&value));
                }
            }
            other => children.extend(cast::to_fragment(other)),
        }
    }
    let mut el = ctx.provider().create_element(tag, &attributes);
    el.children = children;
    Ok(Value::Structural(el))
}

pub(super) fn set_attribute(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut el = into_element(main);
    let name = args.first().and_then(Value::as_str).unwrap_or_default();
    let value = args.get(1).map(cast::to_string).unwrap_or_default();
    el.attributes.insert(name.to_string(), value);
    Ok(Value::Structural(el))
}

pub(super) fn remove_attribute(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut el = into_element(main);
    for name in args.iter().filter_map(Value::as_str) {
        el.attributes.shift_remove(name);
    }
    Ok(Value::Structural(el))
}

pub(super) fn add_class(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut el = into_element(main);
    let mut classes: Vec<String> = el.classes().into_iter().map(String::from).collect();
    for name in class_names(&args) {
        if !classes.contains(&name) {
            classes.push(name);
        }
    }
    el.set_classes(&classes);
    Ok(Value::Structural(el))
}

pub(super) fn remove_class(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut el = into_element(main);
    let removed = class_names(&args);
    let classes: Vec<String> = el
        .classes()
        .into_iter()
        .filter(|c| !removed.iter().any(|r| r == c))
        .map(String::from)
        .collect();
    el.set_classes(&classes);
    Ok(Value::Structural(el))
}

pub(super) fn toggle_class(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let mut el = into_element(main);
    let mut classes: Vec<String> = el.classes().into_iter().map(String::from).collect();
    for name in class_names(&args) {
        match classes.iter().position(|c| *c == name) {
            Some(i) => {
                classes.remove(i);
            }
            None => classes.push(name),
        }
    }
    el.set_classes(&classes);
    Ok(Value::Structural(el))
}

pub(super) fn get_attribute(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    let el = into_element(main);
    let name = args.first().and_then(Value::as_str).unwrap_or_default();
    Ok(el
        .attribute(name)
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null))
}

fn search_roots(main: Value) -> Vec<Node> {
    match main {
        Value::Structural(el) => el.children,
        other => cast::to_fragment(other),
    }
}

/// Matching descendants of an element, or matching members of a node list
/// and their descendants.
pub(super) fn select(main: Value, args: Vec<Value>, _: &mut Context, call: &Call) -> Result<Value, EvalError> {
    let selector = parse_selector(args.first(), call)?;
    let found = selector.select_all(&search_roots(main));
    Ok(Value::NodeFragment(found.into_iter().map(Node::Element).collect()))
}

pub(super) fn transform_selected(
    main: Value,
    args: Vec<Value>,
    ctx: &mut Context,
    call: &Call,
) -> Result<Value, EvalError> {
    let selector = parse_selector(args.first(), call)?;
    let Some(Value::Method(method)) = args.get(1) else {
        return Err(call.fail("expects a method argument"));
    };
    match main {
        Value::Structural(mut el) => {
            let children = std::mem::take(&mut el.children);
            el.children = transform_nodes(children, &selector, method, ctx, call)?;
            Ok(Value::Structural(el))
        }
        other => {
            let nodes = cast::to_fragment(other);
            Ok(Value::NodeFragment(transform_nodes(nodes, &selector, method, ctx, call)?))
        }
    }
}

/// Outermost matches are replaced by the method's result; their own
/// descendants are not searched again.
fn transform_nodes(
    nodes: Vec<Node>,
    selector: &Selector,
    method: &Method,
    ctx: &mut Context,
    call: &Call,
) -> Result<Vec<Node>, EvalError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(el) if selector.matches(&el) => {
                let result = method.invoke(Value::Structural(el), ctx).map_err(|err| {
                    if err.passes_through() {
                        err
                    } else {
                        call.fail(format!("method <{}> failed: {err}", method.name()))
                    }
                })?;
                out.extend(cast::to_fragment(result));
            }
            Node::Element(mut el) => {
                let children = std::mem::take(&mut el.children);
                el.children = transform_nodes(children, selector, method, ctx, call)?;
                out.push(Node::Element(el));
            }
            text => out.push(text),
        }
    }
    Ok(out)
}

pub(super) fn append(main: Value, args: Vec<Value>, _: &mut Context, _: &Call) -> Result<Value, EvalError> {
    Ok(match main {
        Value::Structural(mut el) => {
            for arg in args {
                el.children.extend(cast::to_fragment(arg));
            }
            Value::Structural(el)
        }
        Value::NodeFragment(mut items) => {
            for arg in args {
                items.extend(cast::to_fragment(arg));
            }
            Value::NodeFragment(items)
        }
        Value::Array(mut items) => {
            items.extend(args);
            Value::Array(items)
        }
        textual => {
            let mut text = textual.as_str().unwrap_or_default().to_string();
            for arg in &args {
                text.push_str(&cast::to_string(arg));
            }
            same_textual(&textual, text)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::EvalError;
    use crate::node::{Element, Node};
    use crate::value::Value;
    use serde_json::json;

    fn el(tag: &str) -> Element {
        Element::new(tag)
    }

    fn markup(value: &Value) -> String {
        crate::cast::to_string(value)
    }

    #[test]
    fn element_from_main_and_args() {
        let out = eval(json!({"tag": "nodelist", "children": [
            {"tag": "element", "children": [
                {"tag": "string", "children": ["a"]},
                {"tag": "record", "children": [
                    {"tag": "string", "attributes": {"_key": "href"}, "children": ["/x"]}
                ]},
                {"tag": "string", "children": ["link"]}
            ]}
        ]}))
        .expect("element");
        assert_eq!(markup(&out), "<a href=\"/x\">link</a>");
        assert!(coalesce("element", Value::Null, vec![]).is_err());
    }

    #[test]
    fn attributes_and_classes() {
        let base = Value::Structural(el("p").with_attribute("class", "a b"));
        let out = coalesce("setattribute", base.clone(), vec![Value::string("title"), Value::Number(3.0)]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p class=\"a b\" title=\"3\"></p>".to_string()));
        let out = coalesce("setattribute", base.clone(), vec![Value::string("hidden")]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p class=\"a b\" hidden=\"\"></p>".to_string()));
        let out = coalesce("removeattribute", base.clone(), vec![Value::string("class")]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p></p>".to_string()));
        let out = coalesce("addclass", base.clone(), vec![Value::string("b c")]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p class=\"a b c\"></p>".to_string()));
        let out = coalesce("removeclass", base.clone(), vec![Value::string("a")]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p class=\"b\"></p>".to_string()));
        let out = coalesce("toggleclass", base.clone(), vec![Value::string("a"), Value::string("z")]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<p class=\"b z\"></p>".to_string()));
        assert_eq!(
            coalesce("getattribute", base.clone(), vec![Value::string("class")]),
            Ok(Value::string("a b"))
        );
        assert_eq!(coalesce("getattribute", base, vec![Value::string("id")]), Ok(Value::Null));
    }

    #[test]
    fn select_descendants() {
        let doc = Value::Structural(
            el("div")
                .with_child(el("span").with_attribute("class", "hit").with_text("1"))
                .with_child(el("p").with_child(el("span").with_attribute("class", "hit").with_text("2"))),
        );
        let out = coalesce("select", doc.clone(), vec![Value::string("span.hit")]).expect("select");
        assert_eq!(markup(&out), "<span class=\"hit\">1</span><span class=\"hit\">2</span>");
        assert!(matches!(
            coalesce("select", doc, vec![Value::string("div span")]),
            Err(EvalError::Transformation { .. })
        ));
    }

    #[test]
    fn transform_selected_replaces_matches() {
        let out = eval(json!({"tag": "div", "children": [
            {"tag": "ul", "children": [
                {"tag": "li", "attributes": {"class": "x"}, "children": ["a"]},
                {"tag": "li", "children": ["b"]}
            ]},
            {"tag": "transformselected", "children": [
                {"tag": "string", "children": ["li.x"]},
                {"tag": "method", "children": [
                    {"tag": "addclass", "children": [{"tag": "string", "children": ["done"]}]}
                ]}
            ]}
        ]}));
        let Ok(Value::Structural(root)) = out else {
            panic!("expected element, got {out:?}");
        };
        assert_eq!(
            root.to_markup(),
            "<div><ul><li class=\"x done\">a</li><li>b</li></ul></div>"
        );
    }

    #[test]
    fn transform_selected_passes_missing_references_through() {
        let out = eval(json!({"tag": "div", "children": [
            {"tag": "_transformselected", "children": [
                {"tag": "ul", "children": [{"tag": "li", "children": ["a"]}]},
                {"tag": "string", "children": ["li"]},
                {"tag": "method", "children": [{"tag": "get", "children": ["nope"]}]}
            ]}
        ]}));
        assert!(matches!(out, Err(EvalError::ReferenceNotFound { ref reference, .. }) if reference == "nope"));
    }

    #[test]
    fn append_by_kind() {
        assert_eq!(
            coalesce("append", Value::text("ab"), vec![Value::Number(1.0)]),
            Ok(Value::text("ab1"))
        );
        assert_eq!(
            coalesce("append", Value::from(json!([1])), vec![Value::Number(2.0)]),
            Ok(Value::from(json!([1, 2])))
        );
        let out = coalesce("append", Value::Structural(el("b")), vec![Value::text("x"), Value::Structural(el("i"))]);
        assert_eq!(out.map(|v| markup(&v)), Ok("<b>x<i></i></b>".to_string()));
        assert_eq!(
            coalesce("append", Value::NodeFragment(vec![]), vec![Value::string("t")]),
            Ok(Value::NodeFragment(vec![Node::text("t")]))
        );
        assert!(coalesce("append", Value::Number(1.0), vec![Value::Number(2.0)]).is_err());
    }
}
