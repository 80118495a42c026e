//! Field-path validation of untrusted JSON documents.
//!
//! A cleaner takes a `serde_json::Value` and the path it was found at, and
//! either returns a typed value or a [`ValidationError`] naming the field that
//! did not conform. Record cleaners are built from [`ObjectReader`] plus the
//! leaf cleaners below, and stop at the first failure.
//!
//! Conventions shared by every cleaner:
//! - `null` and an absent key are the same thing.
//! - Keys the schema does not name are ignored.
//! - Cleaners are pure; they never touch shared state.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use airlock_shared::constants::LOGIN_ID_SIZE;
use airlock_shared::encoding::{self, DecodeError};
use airlock_shared::{EncryptedBox, LoginId, Snrp};

// ---------------------------------------------------------------------------
// Paths and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a document, e.g. `children[2].passwordBox.iv_hex`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// The innermost object key on the path, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|segment| match segment {
            PathSegment::Key(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("missing required field")]
    Missing,

    #[error("expected {expected}, got {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    BadEncoding(#[from] DecodeError),

    #[error("expected {expected} bytes, got {found}")]
    BadLength { expected: usize, found: usize },

    #[error("invalid date `{0}`")]
    BadDate(String),

    #[error("`{value}` is not one of {allowed:?}")]
    NotOneOf {
        value: String,
        allowed: &'static [&'static str],
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field `{path}`: {kind}")]
pub struct ValidationError {
    pub path: FieldPath,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(path: &FieldPath, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.clone(),
            kind,
        }
    }

    /// Name of the offending field (`loginId`, `status`, ...).
    pub fn field(&self) -> Option<&str> {
        self.path.leaf()
    }
}

pub type Clean<T> = std::result::Result<T, ValidationError>;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_type(value: &Value, path: &FieldPath, expected: &'static str) -> ValidationError {
    ValidationError::new(
        path,
        ValidationErrorKind::WrongType {
            expected,
            found: type_name(value),
        },
    )
}

// ---------------------------------------------------------------------------
// Object reader
// ---------------------------------------------------------------------------

/// Typed access to the keys of one JSON object.
pub struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: FieldPath,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &FieldPath) -> Clean<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                map,
                path: path.clone(),
            }),
            other => Err(wrong_type(other, path, "object")),
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    pub fn required<T>(
        &self,
        key: &str,
        clean: impl FnOnce(&'a Value, &FieldPath) -> Clean<T>,
    ) -> Clean<T> {
        let path = self.path.key(key);
        match self.present(key) {
            Some(value) => clean(value, &path),
            None => Err(ValidationError::new(&path, ValidationErrorKind::Missing)),
        }
    }

    pub fn optional<T>(
        &self,
        key: &str,
        clean: impl FnOnce(&'a Value, &FieldPath) -> Clean<T>,
    ) -> Clean<Option<T>> {
        self.present(key)
            .map(|value| clean(value, &self.path.key(key)))
            .transpose()
    }

    /// Like [`optional`](Self::optional), substituting `fallback()` when absent.
    pub fn optional_or_else<T>(
        &self,
        key: &str,
        clean: impl FnOnce(&'a Value, &FieldPath) -> Clean<T>,
        fallback: impl FnOnce() -> T,
    ) -> Clean<T> {
        Ok(self.optional(key, clean)?.unwrap_or_else(fallback))
    }
}

// ---------------------------------------------------------------------------
// Leaf cleaners
// ---------------------------------------------------------------------------

pub fn as_str<'v>(value: &'v Value, path: &FieldPath) -> Clean<&'v str> {
    value.as_str().ok_or_else(|| wrong_type(value, path, "string"))
}

pub fn as_string(value: &Value, path: &FieldPath) -> Clean<String> {
    as_str(value, path).map(str::to_string)
}

/// Non-negative integer. Integral floats (`16384.0`) are accepted.
pub fn as_u64(value: &Value, path: &FieldPath) -> Clean<u64> {
    let Value::Number(n) = value else {
        return Err(wrong_type(value, path, "non-negative integer"));
    };
    n.as_u64()
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| wrong_type(value, path, "non-negative integer"))
}

pub fn as_f64(value: &Value, path: &FieldPath) -> Clean<f64> {
    value.as_f64().ok_or_else(|| wrong_type(value, path, "number"))
}

pub fn as_base64(value: &Value, path: &FieldPath) -> Clean<Vec<u8>> {
    let text = as_str(value, path)?;
    encoding::decode_base64(text).map_err(|e| ValidationError::new(path, e.into()))
}

pub fn as_base32(value: &Value, path: &FieldPath) -> Clean<Vec<u8>> {
    let text = as_str(value, path)?;
    encoding::decode_base32(text).map_err(|e| ValidationError::new(path, e.into()))
}

pub fn as_base16(value: &Value, path: &FieldPath) -> Clean<Vec<u8>> {
    let text = as_str(value, path)?;
    encoding::decode_base16(text).map_err(|e| ValidationError::new(path, e.into()))
}

/// RFC 3339 text or epoch milliseconds.
pub fn as_date(value: &Value, path: &FieldPath) -> Clean<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValidationError::new(path, ValidationErrorKind::BadDate(text.clone()))),
        Value::Number(n) => n
            .as_f64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
            .ok_or_else(|| ValidationError::new(path, ValidationErrorKind::BadDate(n.to_string()))),
        other => Err(wrong_type(other, path, "date")),
    }
}

pub fn as_login_id(value: &Value, path: &FieldPath) -> Clean<LoginId> {
    let bytes = as_base64(value, path)?;
    LoginId::from_slice(&bytes).ok_or_else(|| {
        ValidationError::new(
            path,
            ValidationErrorKind::BadLength {
                expected: LOGIN_ID_SIZE,
                found: bytes.len(),
            },
        )
    })
}

/// A string restricted to a closed set of tokens.
pub fn as_one_of<'v>(
    value: &'v Value,
    path: &FieldPath,
    allowed: &'static [&'static str],
) -> Clean<&'v str> {
    let text = as_str(value, path)?;
    if allowed.contains(&text) {
        Ok(text)
    } else {
        Err(ValidationError::new(
            path,
            ValidationErrorKind::NotOneOf {
                value: text.to_string(),
                allowed,
            },
        ))
    }
}

pub fn as_array<T>(
    value: &Value,
    path: &FieldPath,
    clean: impl Fn(&Value, &FieldPath) -> Clean<T>,
) -> Clean<Vec<T>> {
    let Value::Array(items) = value else {
        return Err(wrong_type(value, path, "array"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| clean(item, &path.index(i)))
        .collect()
}

/// An object used as a string-keyed map with uniform values.
pub fn as_map<T>(
    value: &Value,
    path: &FieldPath,
    clean: impl Fn(&Value, &FieldPath) -> Clean<T>,
) -> Clean<BTreeMap<String, T>> {
    let Value::Object(map) = value else {
        return Err(wrong_type(value, path, "object"));
    };
    map.iter()
        .map(|(key, item)| Ok((key.clone(), clean(item, &path.key(key))?)))
        .collect()
}

pub fn as_box(value: &Value, path: &FieldPath) -> Clean<EncryptedBox> {
    let obj = ObjectReader::new(value, path)?;
    Ok(EncryptedBox {
        encryption_type: obj.required("encryptionType", as_u64)?,
        iv: obj.required("iv_hex", as_base16)?,
        data: obj.required("data_base64", as_base64)?,
    })
}

pub fn as_snrp(value: &Value, path: &FieldPath) -> Clean<Snrp> {
    let obj = ObjectReader::new(value, path)?;
    Ok(Snrp {
        salt: obj.required("salt_hex", as_base16)?,
        n: obj.required("n", as_u64)?,
        r: obj.required("r", as_u64)?,
        p: obj.required("p", as_u64)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_display() {
        let path = FieldPath::root()
            .key("children")
            .index(2)
            .key("passwordBox")
            .key("iv_hex");
        assert_eq!(path.to_string(), "children[2].passwordBox.iv_hex");
        assert_eq!(path.leaf(), Some("iv_hex"));
        assert_eq!(FieldPath::root().to_string(), "(root)");
    }

    #[test]
    fn test_leaf_skips_indices() {
        let path = FieldPath::root().key("recovery2Auth").index(1);
        assert_eq!(path.leaf(), Some("recovery2Auth"));
    }

    #[test]
    fn test_null_is_absent() {
        let doc = json!({ "a": null });
        let obj = ObjectReader::new(&doc, &FieldPath::root()).unwrap();

        assert_eq!(obj.optional("a", as_string).unwrap(), None);
        let err = obj.required("a", as_string).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::Missing);
        assert_eq!(err.field(), Some("a"));
    }

    #[test]
    fn test_wrong_type_reports_found() {
        let err = as_string(&json!(12), &FieldPath::root().key("appId")).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::WrongType {
                expected: "string",
                found: "number"
            }
        );
        assert_eq!(err.to_string(), "invalid field `appId`: expected string, got number");
    }

    #[test]
    fn test_u64_accepts_integral_floats_only() {
        let path = FieldPath::root();
        assert_eq!(as_u64(&json!(16384.0), &path).unwrap(), 16384);
        assert!(as_u64(&json!(1.5), &path).is_err());
        assert!(as_u64(&json!(-1), &path).is_err());
        assert!(as_u64(&json!("8"), &path).is_err());
    }

    #[test]
    fn test_date_forms() {
        let path = FieldPath::root();
        let from_text = as_date(&json!("2020-01-01T00:00:00.000Z"), &path).unwrap();
        let from_millis = as_date(&json!(1577836800000i64), &path).unwrap();
        assert_eq!(from_text, from_millis);

        let err = as_date(&json!("last tuesday"), &path).unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::BadDate(_)));
    }

    #[test]
    fn test_array_error_carries_index() {
        let doc = json!(["AQID", "%%"]);
        let err = as_array(&doc, &FieldPath::root().key("recovery2Auth"), as_base64).unwrap_err();
        assert_eq!(err.path.to_string(), "recovery2Auth[1]");
    }

    #[test]
    fn test_box_requires_every_field() {
        let doc = json!({ "encryptionType": 0, "iv_hex": "00" });
        let err = as_box(&doc, &FieldPath::root().key("syncKeyBox")).unwrap_err();
        assert_eq!(err.path.to_string(), "syncKeyBox.data_base64");
    }

    #[test]
    fn test_one_of_is_exact() {
        let allowed: &'static [&'static str] = &["a", "b"];
        assert_eq!(as_one_of(&json!("a"), &FieldPath::root(), allowed).unwrap(), "a");
        assert!(as_one_of(&json!("A"), &FieldPath::root(), allowed).is_err());
    }
}
