use serde_json::Value;

use crate::error::ValidationError;

/// Declarative shape of an expected JSON document.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Any JSON value, including null.
    Any,
    Bool,
    /// A JSON number without a fractional part that fits in an `i64`.
    Integer,
    /// An integer that fits in a `u64`.
    Unsigned,
    /// An integer that fits in an `i32`.
    I32,
    /// An integer that fits in a `u32`.
    U32,
    Number,
    String,
    /// `null` or the inner schema.
    Nullable(Box<Schema>),
    Array(Box<Schema>),
    /// Object with arbitrary keys whose values all match the inner schema.
    Map(Box<Schema>),
    Object(Vec<Field>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub schema: Schema,
    pub required: bool,
}

impl Schema {
    pub fn nullable(inner: Schema) -> Self {
        Schema::Nullable(Box::new(inner))
    }

    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    pub fn map(inner: Schema) -> Self {
        Schema::Map(Box::new(inner))
    }

    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        Schema::Object(fields.into_iter().collect())
    }

    fn describe(&self) -> String {
        match self {
            Schema::Any => "any value".to_string(),
            Schema::Bool => "boolean".to_string(),
            Schema::Integer => "integer".to_string(),
            Schema::Unsigned => "non-negative integer".to_string(),
            Schema::I32 => "32-bit integer".to_string(),
            Schema::U32 => "32-bit non-negative integer".to_string(),
            Schema::Number => "number".to_string(),
            Schema::String => "string".to_string(),
            Schema::Nullable(inner) => format!("{} or null", inner.describe()),
            Schema::Array(inner) => format!("array of {}", inner.describe()),
            Schema::Map(_) | Schema::Object(_) => "object".to_string(),
        }
    }

    /// Check `value` against this schema. The first mismatch wins.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let mut path = String::from("$");
        self.validate_at(value, &mut path)
    }

    fn validate_at(&self, value: &Value, path: &mut String) -> Result<(), ValidationError> {
        let mismatch = |path: &str| {
            ValidationError::new(path, self.describe(), describe_value(value))
        };

        match (self, value) {
            (Schema::Any, _) => Ok(()),
            (Schema::Bool, Value::Bool(_)) => Ok(()),
            (Schema::Integer, Value::Number(n)) if n.is_i64() => Ok(()),
            (Schema::Unsigned, Value::Number(n)) if n.is_u64() => Ok(()),
            (Schema::I32, Value::Number(n))
                if n.as_i64().is_some_and(|v| i32::try_from(v).is_ok()) =>
            {
                Ok(())
            }
            (Schema::U32, Value::Number(n))
                if n.as_u64().is_some_and(|v| u32::try_from(v).is_ok()) =>
            {
                Ok(())
            }
            (Schema::Number, Value::Number(_)) => Ok(()),
            (Schema::String, Value::String(_)) => Ok(()),
            (Schema::Nullable(_), Value::Null) => Ok(()),
            (Schema::Nullable(inner), _) => inner.validate_at(value, path),
            (Schema::Array(inner), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{}]", index));
                    inner.validate_at(item, path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            (Schema::Map(inner), Value::Object(entries)) => {
                for (key, item) in entries {
                    let len = path.len();
                    push_key(path, key);
                    inner.validate_at(item, path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            (Schema::Object(fields), Value::Object(entries)) => {
                for field in fields {
                    let len = path.len();
                    push_key(path, field.name);
                    match entries.get(field.name) {
                        Some(item) => field.schema.validate_at(item, path)?,
                        None if field.required => {
                            return Err(ValidationError::new(
                                path.as_str(),
                                field.schema.describe(),
                                "missing",
                            ));
                        }
                        None => {}
                    }
                    path.truncate(len);
                }
                Ok(())
            }
            _ => Err(mismatch(path)),
        }
    }
}

pub fn required(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        schema,
        required: true,
    }
}

pub fn optional(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        schema,
        required: false,
    }
}

fn push_key(path: &mut String, key: &str) {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        path.push('.');
        path.push_str(key);
    } else {
        path.push_str(&format!("[{:?}]", key));
    }
}

pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) if n.is_f64() => format!("number {}", n),
        Value::Number(n) => format!("integer {}", n),
        Value::String(s) if s.len() <= 32 => format!("string {:?}", s),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
