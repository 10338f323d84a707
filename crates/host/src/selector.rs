//! Minimal CSS selector matching.
//!
//! Supports the subset the tracker contract needs: `tag`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, compounds of those, and comma-separated lists.
//! No combinators. Invalid selectors parse to an error that callers treat as
//! non-matching.

use tracker_core::{Error, Result};

use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

/// A parsed comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let mut compounds = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::validation(format!("empty selector in {:?}", input)));
            }
            compounds.push(parse_compound(part)?);
        }
        Ok(Self { compounds })
    }

    /// True when any compound in the list matches the node.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.compounds.iter().any(|c| compound_matches(c, doc, node))
    }
}

fn parse_compound(input: &str) -> Result<Compound> {
    let mut compound = Compound::default();
    let mut chars = input.chars().peekable();

    // Leading tag name.
    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*' {
            tag.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if !tag.is_empty() && tag != "*" {
        compound.tag = Some(tag.to_ascii_lowercase());
    }

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let ident = take_ident(&mut chars);
                if ident.is_empty() {
                    return Err(Error::validation(format!("bad id selector in {:?}", input)));
                }
                compound.id = Some(ident);
            }
            '.' => {
                let ident = take_ident(&mut chars);
                if ident.is_empty() {
                    return Err(Error::validation(format!(
                        "bad class selector in {:?}",
                        input
                    )));
                }
                compound.classes.push(ident);
            }
            '[' => {
                let mut body = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed || body.is_empty() {
                    return Err(Error::validation(format!(
                        "unterminated attribute selector in {:?}",
                        input
                    )));
                }
                let (name, value) = match body.split_once('=') {
                    Some((n, v)) => (
                        n.trim().to_string(),
                        Some(v.trim().trim_matches('"').trim_matches('\'').to_string()),
                    ),
                    None => (body.trim().to_string(), None),
                };
                if name.is_empty() {
                    return Err(Error::validation(format!(
                        "empty attribute name in {:?}",
                        input
                    )));
                }
                compound.attrs.push(AttrMatcher { name, value });
            }
            other if other.is_whitespace() || other == '>' || other == '+' || other == '~' => {
                return Err(Error::validation(format!(
                    "combinators are not supported: {:?}",
                    input
                )));
            }
            other => {
                return Err(Error::validation(format!(
                    "unexpected {:?} in selector {:?}",
                    other, input
                )));
            }
        }
    }

    if compound == Compound::default() {
        return Err(Error::validation(format!("empty selector {:?}", input)));
    }
    Ok(compound)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    ident
}

fn compound_matches(c: &Compound, doc: &Document, node: NodeId) -> bool {
    if let Some(tag) = &c.tag {
        if doc.tag(node) != tag {
            return false;
        }
    }
    if let Some(id) = &c.id {
        if doc.id_attr(node) != Some(id.as_str()) {
            return false;
        }
    }
    if !c.classes.is_empty() {
        let classes = doc.classes(node);
        if !c.classes.iter().all(|cl| classes.contains(&cl.as_str())) {
            return false;
        }
    }
    for attr in &c.attrs {
        match (doc.attr(node, &attr.name), &attr.value) {
            (None, _) => return false,
            (Some(_), None) => {}
            (Some(actual), Some(expected)) if actual == expected => {}
            _ => return false,
        }
    }
    true
}
