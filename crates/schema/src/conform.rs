//! Runtime conformance: check a JSON value against a schema, fill
//! defaults, and apply transforms.

use serde_json::Value;

use crate::ast::{NumberCheck, Schema, StringFormat};

/// A conformance failure, with a JSON-pointer-ish path to the offending
/// value.
///
/// Adapters turn this into their surface's `validation` error; the schema
/// crate itself stays independent of the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct ConformError {
    /// Path from the root value (`$`, `$.owner.email`, `$.tags[2]`).
    pub path: String,
    /// What was expected and what was found.
    pub message: String,
}

impl ConformError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            message: message.into(),
        }
    }
}

impl Schema {
    /// Validate `value` against this schema, returning the conformed value.
    ///
    /// "Conformed" means defaults are filled for absent object fields and
    /// transforms have been applied, so the handler sees the value the
    /// chain describes rather than the raw wire value.
    pub fn conform(&self, value: Value) -> Result<Value, ConformError> {
        conform_at(self, value, "$")
    }
}

fn conform_at(schema: &Schema, value: Value, path: &str) -> Result<Value, ConformError> {
    match schema {
        Schema::String { format } => match &value {
            Value::String(s) => {
                if let Some(format) = format {
                    check_format(s, *format, path)?;
                }
                Ok(value)
            }
            other => Err(type_mismatch(path, "string", other)),
        },
        Schema::Number { checks, integer } => {
            let Some(n) = value.as_f64() else {
                return Err(type_mismatch(path, "number", &value));
            };
            if *integer && n.fract() != 0.0 {
                return Err(ConformError::new(path, format!("expected integer, got {n}")));
            }
            for check in checks {
                check_number(n, *check, path)?;
            }
            Ok(value)
        }
        Schema::Boolean => match &value {
            Value::Bool(_) => Ok(value),
            other => Err(type_mismatch(path, "boolean", other)),
        },
        Schema::Null => match &value {
            Value::Null => Ok(value),
            other => Err(type_mismatch(path, "null", other)),
        },
        Schema::Literal(expected) => {
            if &value == expected {
                Ok(value)
            } else {
                Err(ConformError::new(path, format!("expected {expected}, got {value}")))
            }
        }
        Schema::Enum(allowed) => {
            if allowed.contains(&value) {
                Ok(value)
            } else {
                Err(ConformError::new(
                    path,
                    format!("{value} is not one of the allowed values"),
                ))
            }
        }
        Schema::Object(fields) => {
            let Value::Object(mut map) = value else {
                return Err(type_mismatch(path, "object", &value));
            };
            for (name, field) in fields {
                let field_path = format!("{path}.{name}");
                match map.remove(name.as_str()) {
                    Some(present) => {
                        let conformed = conform_at(field, present, &field_path)?;
                        map.insert(name.clone(), conformed);
                    }
                    None => {
                        if let Some(filled) = field.value_for_absent() {
                            // A filled default takes the same path as a
                            // present value, so a misdeclared default fails
                            // here instead of reaching the handler.
                            let conformed = conform_at(field, filled, &field_path)?;
                            map.insert(name.clone(), conformed);
                        } else if !field.is_optional() {
                            return Err(ConformError::new(&field_path, "required field is missing"));
                        }
                    }
                }
            }
            // Unknown keys pass through untouched; mapping functions own the
            // decision of what to feed the schema.
            Ok(Value::Object(map))
        }
        Schema::Array(items) => {
            let Value::Array(values) = value else {
                return Err(type_mismatch(path, "array", &value));
            };
            let mut out = Vec::with_capacity(values.len());
            for (index, item) in values.into_iter().enumerate() {
                out.push(conform_at(items, item, &format!("{path}[{index}]"))?);
            }
            Ok(Value::Array(out))
        }
        Schema::Union(branches) => {
            for branch in branches {
                if let Ok(conformed) = conform_at(branch, value.clone(), path) {
                    return Ok(conformed);
                }
            }
            Err(ConformError::new(path, "no union branch matched"))
        }
        Schema::Optional(inner) => match value {
            // At a value position, optional admits null as absence.
            Value::Null => Ok(Value::Null),
            present => conform_at(inner, present, path),
        },
        Schema::Default { inner, .. } => conform_at(inner, value, path),
        Schema::Transform { inner, func } => conform_at(inner, value, path).map(|v| func(v)),
        Schema::Pipe { input, output } => {
            let staged = conform_at(input, value, path)?;
            conform_at(output, staged, path)
        }
        Schema::Describe { inner, .. } => conform_at(inner, value, path),
    }
}

fn type_mismatch(path: &str, expected: &str, got: &Value) -> ConformError {
    let got = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ConformError::new(path, format!("expected {expected}, got {got}"))
}

fn check_number(n: f64, check: NumberCheck, path: &str) -> Result<(), ConformError> {
    let ok = match check {
        NumberCheck::Gt(bound) => n > bound,
        NumberCheck::Gte(bound) => n >= bound,
        NumberCheck::Lt(bound) => n < bound,
        NumberCheck::Lte(bound) => n <= bound,
    };
    if ok {
        Ok(())
    } else {
        let bound_text = match check {
            NumberCheck::Gt(b) => format!("> {b}"),
            NumberCheck::Gte(b) => format!(">= {b}"),
            NumberCheck::Lt(b) => format!("< {b}"),
            NumberCheck::Lte(b) => format!("<= {b}"),
        };
        Err(ConformError::new(path, format!("{n} is not {bound_text}")))
    }
}

// Structural checks only; a full RFC-grade validator belongs to whichever
// surface needs one.
fn check_format(s: &str, format: StringFormat, path: &str) -> Result<(), ConformError> {
    let ok = match format {
        StringFormat::Email => {
            s.split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        }
        StringFormat::Uri => s.contains("://"),
        StringFormat::Uuid => {
            s.len() == 36 && s.chars().all(|c| c == '-' || c.is_ascii_hexdigit())
        }
        StringFormat::DateTime => s.contains('T') && s.len() >= 19,
    };
    if ok {
        Ok(())
    } else {
        Err(ConformError::new(
            path,
            format!("not a valid {}", format.as_str()),
        ))
    }
}
