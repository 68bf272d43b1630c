//! Config ↔ Lua table conversion.
//!
//! The round-trip format: a body becomes the two-element array
//! `{name, {children…}}`; an attribute becomes a single-pair table keyed by
//! the attribute name. A config is an array of such nodes. Decoding
//! validates the shape and aborts on the first violation; the binding layer
//! unwinds the interpreter stack, so a failed conversion leaves the
//! interpreter exactly as it entered.

use mlua::{Lua, Table, Value};

use crate::error::ShapeError;
use crate::gml::{Attribute, Body, Config, Node};

/// Encode a config as a Lua array of node encodings.
pub fn push_config(lua: &Lua, config: &[Node]) -> mlua::Result<Table> {
    let out = lua.create_table()?;
    for (i, node) in config.iter().enumerate() {
        let encoded = match node {
            Node::Body(body) => push_body(lua, body)?,
            Node::Attribute(attr) => {
                let pair = lua.create_table()?;
                pair.set(attr.key.as_str(), attr.value.as_str())?;
                pair
            }
        };
        out.raw_set(i + 1, encoded)?;
    }
    Ok(out)
}

/// Encode a body as the two-element array `{name, children}`.
pub fn push_body(lua: &Lua, body: &Body) -> mlua::Result<Table> {
    let out = lua.create_table()?;
    out.raw_set(1, body.name.as_str())?;
    out.raw_set(2, push_config(lua, &body.children)?)?;
    Ok(out)
}

/// Decode a config from a Lua value. Nil decodes as the empty config.
pub fn config_from_value(value: &Value) -> Result<Config, ShapeError> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Table(table) => config_from_table(table),
        other => Err(ShapeError::new("a config table", other.type_name())),
    }
}

fn config_from_table(table: &Table) -> Result<Config, ShapeError> {
    let mut out = Vec::new();
    for i in 1..=table.raw_len() {
        let child: Value = table
            .raw_get(i)
            .map_err(|_| ShapeError::new("a readable array entry", "an inaccessible value"))?;
        match child {
            Value::Table(child) => out.push(node_from_table(&child)?),
            other => return Err(ShapeError::new("a node table", other.type_name())),
        }
    }
    Ok(out)
}

fn node_from_table(table: &Table) -> Result<Node, ShapeError> {
    if table.raw_len() == 2 {
        let name: Value = table
            .raw_get(1)
            .map_err(|_| ShapeError::new("a tag name", "an inaccessible value"))?;
        let children: Value = table
            .raw_get(2)
            .map_err(|_| ShapeError::new("a children table", "an inaccessible value"))?;
        return match (name, children) {
            (Value::String(name), Value::Table(children)) => Ok(Node::Body(Body {
                name: name.to_string_lossy().to_string(),
                children: config_from_table(&children)?,
            })),
            (Value::String(_), other) => {
                Err(ShapeError::new("a children table at index 2", other.type_name()))
            }
            (other, _) => Err(ShapeError::new("a string tag name at index 1", other.type_name())),
        };
    }

    let table_clone = table.clone();
    let mut pairs = table_clone.pairs::<Value, Value>();
    let Some(first) = pairs.next() else {
        return Err(ShapeError::new("an attribute pair", "an empty table"));
    };
    let (key, value) = first.map_err(|_| ShapeError::new("an attribute pair", "an unreadable pair"))?;
    if pairs.next().is_some() {
        return Err(ShapeError::new(
            "a single attribute pair",
            "a table with several pairs",
        ));
    }
    match (key, value) {
        (Value::String(key), Value::String(value)) => Ok(Node::Attribute(Attribute {
            key: key.to_string_lossy().to_string(),
            value: value.to_string_lossy().to_string(),
        })),
        (Value::String(_), other) => {
            Err(ShapeError::new("a string attribute value", other.type_name()))
        }
        (other, _) => Err(ShapeError::new("a string attribute key", other.type_name())),
    }
}
