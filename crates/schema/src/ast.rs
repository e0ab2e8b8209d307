//! The closed schema node set and its fluent builder surface.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// A value-to-value mapping applied after the wrapped schema validates.
///
/// Transforms run during [`conform`](Schema::conform) only; they are
/// invisible to the compiler apart from preserving the chain's optionality.
pub type TransformFn = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Numeric range checks attached to a [`Schema::Number`] node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberCheck {
    /// Strictly greater than; compiles to `exclusiveMinimum`.
    Gt(f64),
    /// Greater than or equal; compiles to `minimum`.
    Gte(f64),
    /// Strictly less than; compiles to `exclusiveMaximum`.
    Lt(f64),
    /// Less than or equal; compiles to `maximum`.
    Lte(f64),
}

/// Well-known string formats. Compiles to the `format` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// An email address.
    Email,
    /// An absolute URI.
    Uri,
    /// A UUID in canonical hyphenated form.
    Uuid,
    /// An RFC 3339 date-time.
    DateTime,
}

impl StringFormat {
    /// The JSON Schema `format` keyword value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
        }
    }
}

/// A composable validation schema.
///
/// The node set is closed on purpose: the compiler matches exhaustively and
/// a new kind cannot appear without the compiler learning about it first.
#[derive(Clone)]
pub enum Schema {
    /// A string, optionally constrained to a well-known format.
    String {
        /// Format check, if any.
        format: Option<StringFormat>,
    },
    /// A number with zero or more range checks.
    Number {
        /// Range checks, applied in order.
        checks: Vec<NumberCheck>,
        /// Narrows the compiled type from `number` to `integer`.
        integer: bool,
    },
    /// A boolean.
    Boolean,
    /// The JSON `null` value.
    Null,
    /// Exactly one literal value.
    Literal(serde_json::Value),
    /// One of two or more literal values.
    Enum(Vec<serde_json::Value>),
    /// An object with named fields, each independently optional or required.
    Object(IndexMap<String, Schema>),
    /// A homogeneous array.
    Array(Box<Schema>),
    /// Any of several branch schemas.
    Union(Vec<Schema>),
    /// Marks the wrapped schema as satisfiable by absence.
    Optional(Box<Schema>),
    /// Supplies a value when the field is absent; absence therefore
    /// satisfies the schema.
    Default {
        /// The wrapped schema.
        inner: Box<Schema>,
        /// Value filled in for an absent field.
        value: serde_json::Value,
    },
    /// A post-validation value mapping. Preserves the chain's optionality.
    Transform {
        /// The wrapped schema.
        inner: Box<Schema>,
        /// The mapping applied to the conformed value.
        func: TransformFn,
    },
    /// Validate against `input`, then feed the result through `output`.
    Pipe {
        /// The wire-facing stage; its shape is what gets advertised.
        input: Box<Schema>,
        /// The later validation stage.
        output: Box<Schema>,
    },
    /// Attaches a human-readable description, carried verbatim.
    Describe {
        /// The wrapped schema.
        inner: Box<Schema>,
        /// Description text.
        text: String,
    },
}

impl Schema {
    /// An unconstrained string.
    pub fn string() -> Self {
        Self::String { format: None }
    }

    /// An unconstrained number.
    pub fn number() -> Self {
        Self::Number {
            checks: Vec::new(),
            integer: false,
        }
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// The JSON `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Exactly one literal value.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    /// One of several literal values.
    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// An object with the given named fields, in declaration order.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A homogeneous array of `items`.
    pub fn array(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    /// Any of the given branch schemas.
    pub fn union<I>(branches: I) -> Self
    where
        I: IntoIterator<Item = Schema>,
    {
        Self::Union(branches.into_iter().collect())
    }

    // ── chain combinators ───────────────────────────────────────────────────

    /// Absence satisfies this schema.
    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }

    /// Fill `value` when the field is absent. Marks the chain optional.
    pub fn default_value(self, value: serde_json::Value) -> Self {
        Self::Default {
            inner: Box::new(self),
            value,
        }
    }

    /// Map the conformed value. Preserves the chain's optionality.
    pub fn transform<F>(self, func: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        Self::Transform {
            inner: Box::new(self),
            func: Arc::new(func),
        }
    }

    /// Validate against `self`, then feed the result through `next`.
    pub fn pipe(self, next: Schema) -> Self {
        Self::Pipe {
            input: Box::new(self),
            output: Box::new(next),
        }
    }

    /// Shorthand for a union of `self` with `null`.
    pub fn nullable(self) -> Self {
        Self::Union(vec![self, Self::Null])
    }

    /// Attach a description, carried verbatim into the compiled schema.
    pub fn describe(self, text: impl Into<String>) -> Self {
        Self::Describe {
            inner: Box::new(self),
            text: text.into(),
        }
    }

    // ── checks ──────────────────────────────────────────────────────────────

    /// Strictly greater than. No effect on non-numeric bases.
    pub fn gt(self, value: f64) -> Self {
        self.with_number_check(NumberCheck::Gt(value))
    }

    /// Greater than or equal. No effect on non-numeric bases.
    pub fn gte(self, value: f64) -> Self {
        self.with_number_check(NumberCheck::Gte(value))
    }

    /// Strictly less than. No effect on non-numeric bases.
    pub fn lt(self, value: f64) -> Self {
        self.with_number_check(NumberCheck::Lt(value))
    }

    /// Less than or equal. No effect on non-numeric bases.
    pub fn lte(self, value: f64) -> Self {
        self.with_number_check(NumberCheck::Lte(value))
    }

    /// Narrow a number to integers. No effect on non-numeric bases.
    pub fn int(self) -> Self {
        self.map_base(&mut |base| match base {
            Self::Number { checks, .. } => Self::Number {
                checks,
                integer: true,
            },
            other => other,
        })
    }

    /// Constrain a string to a well-known format. No effect on non-string
    /// bases.
    pub fn format(self, format: StringFormat) -> Self {
        self.map_base(&mut |base| match base {
            Self::String { .. } => Self::String {
                format: Some(format),
            },
            other => other,
        })
    }

    /// Shorthand for `format(StringFormat::Email)`.
    pub fn email(self) -> Self {
        self.format(StringFormat::Email)
    }

    fn with_number_check(self, check: NumberCheck) -> Self {
        self.map_base(&mut |base| match base {
            Self::Number { mut checks, integer } => {
                checks.push(check);
                Self::Number { checks, integer }
            }
            other => other,
        })
    }

    /// Apply `f` to the base node under any chain combinators. For a pipe,
    /// the wire-facing input side is the base.
    fn map_base(self, f: &mut dyn FnMut(Schema) -> Schema) -> Self {
        match self {
            Self::Optional(inner) => Self::Optional(Box::new(inner.map_base(f))),
            Self::Default { inner, value } => Self::Default {
                inner: Box::new(inner.map_base(f)),
                value,
            },
            Self::Transform { inner, func } => Self::Transform {
                inner: Box::new(inner.map_base(f)),
                func,
            },
            Self::Describe { inner, text } => Self::Describe {
                inner: Box::new(inner.map_base(f)),
                text,
            },
            Self::Pipe { input, output } => Self::Pipe {
                input: Box::new(input.map_base(f)),
                output,
            },
            base => f(base),
        }
    }

    // ── optionality ─────────────────────────────────────────────────────────

    /// Whether absence satisfies this schema.
    ///
    /// The chain rules, exactly:
    /// - `optional()` always marks optional;
    /// - `default(x)` marks optional (a default satisfies absence);
    /// - `transform(f)` and `describe(..)` preserve their input's optionality;
    /// - `pipe(a, b)` is optional **only if both** sides independently are;
    ///   a required side means the pipe still enforces presence at a later
    ///   validation stage;
    /// - every other node is required.
    pub fn is_optional(&self) -> bool {
        match self {
            Self::Optional(_) | Self::Default { .. } => true,
            Self::Transform { inner, .. } | Self::Describe { inner, .. } => inner.is_optional(),
            Self::Pipe { input, output } => input.is_optional() && output.is_optional(),
            _ => false,
        }
    }

    /// The raw declared value an absent field resolves to, if the chain
    /// supplies one.
    ///
    /// The value is returned as declared; conformance then runs it through
    /// the chain, so a misdeclared default fails validation and transforms
    /// apply exactly once.
    pub(crate) fn value_for_absent(&self) -> Option<serde_json::Value> {
        match self {
            Self::Default { value, .. } => Some(value.clone()),
            Self::Optional(inner)
            | Self::Describe { inner, .. }
            | Self::Transform { inner, .. } => inner.value_for_absent(),
            Self::Pipe { input, .. } => input.value_for_absent(),
            _ => None,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { format } => f.debug_struct("String").field("format", format).finish(),
            Self::Number { checks, integer } => f
                .debug_struct("Number")
                .field("checks", checks)
                .field("integer", integer)
                .finish(),
            Self::Boolean => f.write_str("Boolean"),
            Self::Null => f.write_str("Null"),
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Enum(vs) => f.debug_tuple("Enum").field(vs).finish(),
            Self::Object(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k.as_str(), v)))
                .finish(),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Union(branches) => f.debug_tuple("Union").field(branches).finish(),
            Self::Optional(inner) => f.debug_tuple("Optional").field(inner).finish(),
            Self::Default { inner, value } => f
                .debug_struct("Default")
                .field("inner", inner)
                .field("value", value)
                .finish(),
            Self::Transform { inner, .. } => f.debug_tuple("Transform").field(inner).finish(),
            Self::Pipe { input, output } => f
                .debug_struct("Pipe")
                .field("input", input)
                .field("output", output)
                .finish(),
            Self::Describe { inner, text } => f
                .debug_struct("Describe")
                .field("inner", inner)
                .field("text", text)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_marks_optional() {
        assert!(Schema::string().optional().is_optional());
        assert!(!Schema::string().is_optional());
    }

    #[test]
    fn default_marks_optional() {
        assert!(Schema::number().default_value(5.into()).is_optional());
    }

    #[test]
    fn transform_preserves_optionality() {
        assert!(Schema::string().optional().transform(|v| v).is_optional());
        assert!(!Schema::string().transform(|v| v).is_optional());
    }

    #[test]
    fn describe_preserves_optionality() {
        assert!(Schema::string().optional().describe("d").is_optional());
        assert!(!Schema::string().describe("d").is_optional());
    }

    #[test]
    fn pipe_requires_both_sides_optional() {
        // optional piped into required ⇒ required
        let one_side = Schema::string().optional().pipe(Schema::string());
        assert!(!one_side.is_optional());

        // required piped into optional ⇒ required
        let other_side = Schema::string().pipe(Schema::string().optional());
        assert!(!other_side.is_optional());

        // optional piped into optional ⇒ optional
        let both = Schema::string().optional().pipe(Schema::string().optional());
        assert!(both.is_optional());
    }

    #[test]
    fn checks_reach_through_combinators() {
        let schema = Schema::number().optional().gte(1.0).int();
        let Schema::Optional(inner) = schema else {
            panic!("expected Optional");
        };
        let Schema::Number { checks, integer } = *inner else {
            panic!("expected Number");
        };
        assert_eq!(checks, vec![NumberCheck::Gte(1.0)]);
        assert!(integer);
    }

    #[test]
    fn checks_are_inert_on_wrong_base() {
        // A numeric check on a string base leaves the schema untouched.
        let schema = Schema::string().gt(3.0);
        assert!(matches!(schema, Schema::String { format: None }));
    }

    #[test]
    fn absent_value_is_the_raw_declared_default() {
        // The transform is left to conformance; filling returns the value
        // exactly as declared.
        let schema = Schema::string()
            .default_value("anon".into())
            .transform(|v| serde_json::Value::String(format!("user:{}", v.as_str().unwrap())));
        assert_eq!(
            schema.value_for_absent(),
            Some(serde_json::Value::String("anon".into()))
        );
    }

    #[test]
    fn debug_skips_transform_closure() {
        let schema = Schema::string().transform(|v| v);
        let rendered = format!("{schema:?}");
        assert!(rendered.starts_with("Transform"));
    }
}
