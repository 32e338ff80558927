//! Minimal CSS selector matching for `select` and `transformselected`.
//!
//! Supported: `*`, `tag`, `.class`, `#id`, `[attr]`, `[attr=value]`, compound
//! selectors (`div.card[data-x]`) and comma-separated lists. Combinators are
//! rejected.

use crate::node::{Element, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':')
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let alternatives = raw
            .split(',')
            .map(|part| parse_compound(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, el: &Element) -> bool {
        self.alternatives.iter().any(|c| c.matches(el))
    }

    /// Matching descendants of `nodes` in document order; `nodes` themselves
    /// are candidates too.
    pub fn select_all(&self, nodes: &[Node]) -> Vec<Element> {
        let mut found = Vec::new();
        for node in nodes {
            if let Node::Element(el) = node {
                if self.matches(el) {
                    found.push(el.clone());
                }
                found.extend(self.select_all(&el.children));
            }
        }
        found
    }
}

fn parse_compound(part: &str) -> Result<Compound, String> {
    if part.is_empty() {
        return Err("empty selector".to_string());
    }
    if part.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~')) {
        return Err(format!("combinators are not supported: `{part}`"));
    }

    let mut compound = Compound::default();
    let mut rest = part;
    while let Some(c) = rest.chars().next() {
        match c {
            '*' => rest = &rest[1..],
            '.' | '#' => {
                let (name, tail) = take_ident(&rest[1..]);
                if name.is_empty() {
                    return Err(format!("missing name after `{c}` in `{part}`"));
                }
                if c == '.' {
                    compound.classes.push(name.to_string());
                } else {
                    compound.id = Some(name.to_string());
                }
                rest = tail;
            }
            '[' => {
                let Some(end) = rest.find(']') else {
                    return Err(format!("unclosed `[` in `{part}`"));
                };
                let inner = &rest[1..end];
                let attribute = match inner.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_string(),
                        Some(value.trim().trim_matches(|q| q == '"' || q == '\'').to_string()),
                    ),
                    None => (inner.trim().to_string(), None),
                };
                if attribute.0.is_empty() {
                    return Err(format!("missing attribute name in `{part}`"));
                }
                compound.attributes.push(attribute);
                rest = &rest[end + 1..];
            }
            c if is_ident_char(c) && compound.tag.is_none() && rest.len() == part.len() => {
                let (name, tail) = take_ident(rest);
                compound.tag = Some(name.to_ascii_lowercase());
                rest = tail;
            }
            other => return Err(format!("unexpected `{other}` in `{part}`")),
        }
    }
    Ok(compound)
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    input.split_at(end)
}

impl Compound {
    fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| el.has_class(c))
            && self.attributes.iter().all(|(name, value)| match value {
                Some(value) => el.attribute(name) == Some(value.as_str()),
                None => el.attribute(name).is_some(),
            })
    }
}
