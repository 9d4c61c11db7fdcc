//! Generic attribute tree with dotted-path lookup.
//!
//! A certificate is flattened into a tree of [`AttributeNode`]s. Each node may
//! carry a scalar [`Value`] and named children at the same time (a key usage
//! node holds its bitmask and one boolean child per flag). Rule targets are
//! dot-separated paths; every `.` separates two segments, so OID-keyed
//! entries are stored one arc per level by the builder.

mod builder;

pub use builder::{build_tree, ROOT_KEY};

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A scalar carried by a tree node or supplied as a rule operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    Time(OffsetDateTime),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Time(_) => "timestamp",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{}", crate::util::hex_colon_upper(v)),
            Value::String(v) => write!(f, "{}", v),
            Value::Time(v) => match v.format(&Rfc3339) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "{}", v.unix_timestamp()),
            },
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Value::Time(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bytes(_) | Value::String(_) | Value::Time(_) => {
                serializer.collect_str(self)
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a boolean, number, string, or list of those")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }
}

/// One node of the attribute tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeNode {
    pub name: String,
    pub value: Option<Value>,
    pub children: BTreeMap<String, AttributeNode>,
}

impl AttributeNode {
    /// A node with no value and no children.
    pub fn new(name: impl Into<String>) -> Self {
        AttributeNode {
            name: name.into(),
            value: None,
            children: BTreeMap::new(),
        }
    }

    /// A node carrying a scalar value.
    pub fn leaf(name: impl Into<String>, value: impl Into<Value>) -> Self {
        AttributeNode {
            name: name.into(),
            value: Some(value.into()),
            children: BTreeMap::new(),
        }
    }

    /// Builder-style variant of [`AttributeNode::insert`].
    pub fn with_child(mut self, child: AttributeNode) -> Self {
        self.insert(child);
        self
    }

    /// Insert `child` under its own name, replacing any previous child.
    pub fn insert(&mut self, child: AttributeNode) {
        self.children.insert(child.name.clone(), child);
    }

    /// Insert `node` at a dotted path below this node, creating intermediate
    /// nodes as needed. A node already at the final segment keeps its
    /// children and takes over the new value and children.
    pub fn insert_path(&mut self, path: &str, node: AttributeNode) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };
        let mut current = self;
        for segment in segments {
            current = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| AttributeNode::new(segment));
        }
        let slot = current
            .children
            .entry(last.to_string())
            .or_insert_with(|| AttributeNode::new(last));
        if node.value.is_some() {
            slot.value = node.value;
        }
        slot.children.extend(node.children);
    }

    /// Direct child by key.
    pub fn child(&self, key: &str) -> Option<&AttributeNode> {
        self.children.get(key)
    }

    /// Resolve a dotted path from this node. The empty path resolves to the
    /// node itself; any missing segment yields `None`.
    pub fn resolve(&self, path: &str) -> Option<&AttributeNode> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Boolean value of the `critical` child, if present.
    pub fn critical(&self) -> Option<bool> {
        self.child("critical").and_then(|c| c.value.as_ref()?.as_bool())
    }

    /// Every node below this one paired with its dotted path, depth first.
    pub fn walk(&self) -> Vec<(String, &AttributeNode)> {
        let mut out = Vec::new();
        walk_into(self, String::new(), &mut out);
        out
    }
}

fn walk_into<'a>(
    node: &'a AttributeNode,
    prefix: String,
    out: &mut Vec<(String, &'a AttributeNode)>,
) {
    for (key, child) in &node.children {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        out.push((path.clone(), child));
        walk_into(child, path, out);
    }
}

impl Serialize for AttributeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(value) = &self.value {
            map.serialize_entry("value", value)?;
        }
        if !self.children.is_empty() {
            map.serialize_entry("children", &self.children)?;
        }
        map.end()
    }
}
