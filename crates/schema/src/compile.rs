//! Translation from [`Schema`] trees to the portable compiled form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::{NumberCheck, Schema};

/// The portable, serializable description of an input contract.
///
/// Shaped like JSON Schema so any surface can advertise it directly. Pure
/// derived data: recomputed on demand from the source [`Schema`], never
/// mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSchema {
    /// The `type` keyword (`"string"`, `"integer"`, `"object"`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    /// Per-field schemas for objects, in declaration order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, CompiledSchema>>,
    /// Element schema for arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<CompiledSchema>>,
    /// Names of required fields. Omitted entirely when every field is
    /// optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Allowed literal values (two or more).
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<serde_json::Value>>,
    /// Union branches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<CompiledSchema>>,
    /// A single allowed literal value.
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<serde_json::Value>,
    /// String format hint (`"email"`, `"uri"`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Exclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    /// Exclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    /// Value an absent field resolves to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Human-readable description, carried verbatim from `describe`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CompiledSchema {
    fn typed(ty: &str) -> Self {
        Self {
            ty: Some(ty.to_owned()),
            ..Self::default()
        }
    }
}

/// Compilation failure.
///
/// The node set is closed, so "unknown kind" is unrepresentable; what
/// remains are degenerate trees the compiler refuses to approximate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// An `enum` node with no values.
    #[error("enum schema has no values")]
    EmptyEnum,
    /// A `union` node with no branches.
    #[error("union schema has no branches")]
    EmptyUnion,
}

/// Compile a schema into its portable description.
///
/// Pure and deterministic. Optionality only matters at object-field
/// boundaries, so chain combinators compile to their base shape; the
/// `required` list of the enclosing object is where the chain rules of
/// [`Schema::is_optional`] surface.
pub fn compile(schema: &Schema) -> Result<CompiledSchema, CompileError> {
    match schema {
        Schema::String { format } => {
            let mut out = CompiledSchema::typed("string");
            out.format = format.map(|f| f.as_str().to_owned());
            Ok(out)
        }
        Schema::Number { checks, integer } => {
            let mut out = CompiledSchema::typed(if *integer { "integer" } else { "number" });
            for check in checks {
                match *check {
                    NumberCheck::Gt(v) => out.exclusive_minimum = Some(v),
                    NumberCheck::Gte(v) => out.minimum = Some(v),
                    NumberCheck::Lt(v) => out.exclusive_maximum = Some(v),
                    NumberCheck::Lte(v) => out.maximum = Some(v),
                }
            }
            Ok(out)
        }
        Schema::Boolean => Ok(CompiledSchema::typed("boolean")),
        Schema::Null => Ok(CompiledSchema::typed("null")),
        Schema::Literal(value) => Ok(CompiledSchema {
            constant: Some(value.clone()),
            ..CompiledSchema::default()
        }),
        Schema::Enum(values) => compile_enum(values),
        Schema::Object(fields) => {
            let mut properties = IndexMap::with_capacity(fields.len());
            let mut required = Vec::new();
            for (name, field) in fields {
                properties.insert(name.clone(), compile(field)?);
                if !field.is_optional() {
                    required.push(name.clone());
                }
            }
            let mut out = CompiledSchema::typed("object");
            out.properties = Some(properties);
            out.required = if required.is_empty() {
                None
            } else {
                Some(required)
            };
            Ok(out)
        }
        Schema::Array(items) => {
            let mut out = CompiledSchema::typed("array");
            out.items = Some(Box::new(compile(items)?));
            Ok(out)
        }
        Schema::Union(branches) => {
            if branches.is_empty() {
                return Err(CompileError::EmptyUnion);
            }
            let compiled = branches.iter().map(compile).collect::<Result<_, _>>()?;
            Ok(CompiledSchema {
                any_of: Some(compiled),
                ..CompiledSchema::default()
            })
        }
        // Chain combinators: compile the underlying shape. Optionality is
        // consumed by the enclosing object's `required` list.
        Schema::Optional(inner) | Schema::Transform { inner, .. } => compile(inner),
        Schema::Default { inner, value } => {
            let mut out = compile(inner)?;
            out.default = Some(value.clone());
            Ok(out)
        }
        // The input side is what the wire accepts; the output stage is a
        // later validation step with no advertised shape of its own.
        Schema::Pipe { input, .. } => compile(input),
        Schema::Describe { inner, text } => {
            let mut out = compile(inner)?;
            out.description = Some(text.clone());
            Ok(out)
        }
    }
}

fn compile_enum(values: &[serde_json::Value]) -> Result<CompiledSchema, CompileError> {
    match values {
        [] => Err(CompileError::EmptyEnum),
        // A one-value enum is a constant, not a one-element list.
        [single] => Ok(CompiledSchema {
            constant: Some(single.clone()),
            ..CompiledSchema::default()
        }),
        _ => {
            let mut out = CompiledSchema {
                enumeration: Some(values.to_vec()),
                ..CompiledSchema::default()
            };
            // Only claim a base type when every value agrees on one.
            let first = base_type(&values[0]);
            if values.iter().all(|v| base_type(v) == first) {
                out.ty = first.map(str::to_owned);
            }
            Ok(out)
        }
    }
}

fn base_type(value: &serde_json::Value) -> Option<&'static str> {
    match value {
        serde_json::Value::String(_) => Some("string"),
        serde_json::Value::Number(_) => Some("number"),
        serde_json::Value::Bool(_) => Some("boolean"),
        serde_json::Value::Null => Some("null"),
        _ => None,
    }
}
