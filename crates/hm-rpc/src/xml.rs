//! XML-RPC wire encoding
//!
//! Calls are encoded from `serde_json::Value` parameters and responses are
//! decoded back into `serde_json::Value`, which the typed client then
//! deserializes into the `hm-core` structures. Integer and double values stay
//! distinguishable through the round trip (`i4` ↔ integer number,
//! `double` ↔ float number).

use crate::error::{RpcError, RpcResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use std::fmt::Write;

/// Encode a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Number(n) => encode_number(out, n),
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn encode_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        if i32::try_from(i).is_ok() {
            let _ = write!(out, "<i4>{}</i4>", i);
        } else {
            let _ = write!(out, "<i8>{}</i8>", i);
        }
    } else {
        let f = n.as_f64().unwrap_or_default();
        let _ = write!(out, "<double>{:?}</double>", f);
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Minimal element tree built from the response document
#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn parse_tree(body: &str) -> Result<Node, String> {
    let mut reader = Reader::from_str(body);
    let mut stack = vec![Node::new(b"#document")];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Node::new(e.local_name().as_ref())),
            Ok(Event::Empty(e)) => {
                let node = Node::new(e.local_name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or("unbalanced end tag")?;
                let parent = stack.last_mut().ok_or("unbalanced end tag")?;
                parent.children.push(node);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&raw));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("{} at position {}", e, reader.buffer_position())),
        }
    }

    if stack.len() != 1 {
        return Err("unexpected end of document".to_string());
    }
    stack.pop().ok_or_else(|| "empty document".to_string())
}

fn decode_value(node: &Node) -> Result<Value, String> {
    let Some(typed) = node.children.first() else {
        // A <value> without a type element is a string
        return Ok(Value::String(node.text.clone()));
    };

    match typed.name.as_str() {
        "i4" | "int" | "i8" => typed
            .text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("invalid integer '{}': {}", typed.text.trim(), e)),
        "boolean" => match typed.text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(format!("invalid boolean '{}'", other)),
        },
        "double" => {
            let f = typed
                .text
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid double '{}': {}", typed.text.trim(), e))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| format!("non-finite double '{}'", typed.text.trim()))
        }
        "string" => Ok(Value::String(typed.text.clone())),
        "nil" => Ok(Value::Null),
        "dateTime.iso8601" | "base64" => Ok(Value::String(typed.text.trim().to_string())),
        "array" => {
            let Some(data) = typed.child("data") else {
                return Ok(Value::Array(Vec::new()));
            };
            data.children_named("value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut map = Map::new();
            for member in typed.children_named("member") {
                let name = member
                    .child("name")
                    .map(|n| n.text.clone())
                    .ok_or("struct member without name")?;
                let value = member
                    .child("value")
                    .ok_or_else(|| format!("struct member '{}' without value", name))?;
                map.insert(name, decode_value(value)?);
            }
            Ok(Value::Object(map))
        }
        other => Err(format!("unsupported value type <{}>", other)),
    }
}

/// Decode a `methodResponse` document
///
/// Faults are returned as [`RpcError::Fault`]; a response without a
/// parameter decodes to `Value::Null`.
pub fn decode_response(method: &str, body: &str) -> RpcResult<Value> {
    let document = parse_tree(body).map_err(|reason| RpcError::decode(method, reason))?;
    let response = document
        .child("methodResponse")
        .ok_or_else(|| RpcError::decode(method, "missing <methodResponse>"))?;

    if let Some(fault) = response.child("fault") {
        let value = fault
            .child("value")
            .ok_or_else(|| RpcError::decode(method, "fault without value"))
            .and_then(|v| decode_value(v).map_err(|r| RpcError::decode(method, r)))?;
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcError::Fault {
            method: method.to_string(),
            code,
            message,
        });
    }

    match response
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
    {
        Some(value) => decode_value(value).map_err(|reason| RpcError::decode(method, reason)),
        None => Ok(Value::Null),
    }
}
