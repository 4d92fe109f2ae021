//! Normalized probe values
//!
//! Everything a probe can produce is reduced to a [`Value`]: a primitive, an
//! exception captured at the probe site, or an opaque reference to a host
//! object. Host objects are never inspected deeply; tests compare them by
//! identity or through the small set of accessor projections the host exposes.

pub mod compare;

pub use compare::{normalize, same_value, values_match, Comparison};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Result of evaluating a probe against the host
pub type Completion = std::result::Result<Value, Exception>;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A probe result in canonical, comparable form
///
/// `==` on `Value` is plain structural equality (`NaN != NaN`, objects by
/// identity). Assertions compare through [`values_match`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// An exception thrown while evaluating the probe
    Exception(Exception),
    /// Opaque host object
    Object(ObjectRef),
}

impl Value {
    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is nullish (null or undefined)
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if value is a captured exception
    pub fn is_exception(&self) -> bool {
        matches!(self, Value::Exception(_))
    }

    /// Numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Captured exception, if any
    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Value::Exception(e) => Some(e),
            _ => None,
        }
    }

    /// JavaScript truthiness
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Exception(_) | Value::Object(_) => true,
        }
    }

    /// Get the `typeof` result. Exceptions report as `"string"` because they
    /// are compared through their normalized string form.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) | Value::Exception(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Convert to a string the way `String(value)` would
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(true) => "true".to_string(),
            Value::Boolean(false) => "false".to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Exception(e) => e.to_string(),
            Value::Object(obj) => format!("[object {}]", obj.class()),
        }
    }

    /// Render as an operand in an assertion message: strings are quoted and
    /// escaped, negative zero keeps its sign.
    pub fn stringify(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
            other => other.to_js_string(),
        }
    }

    /// Read an accessor projection. Objects answer from their host-supplied
    /// projections; strings expose `length`; everything else is undefined.
    pub fn project(&self, accessor: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(accessor),
            Value::String(s) if accessor == "length" => {
                Value::Number(s.encode_utf16().count() as f64)
            }
            _ => Value::Undefined,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Exception> for Value {
    fn from(e: Exception) -> Self {
        Value::Exception(e)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<Completion> for Value {
    fn from(completion: Completion) -> Self {
        normalize(completion)
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form with an explicit sign, e.g. 1e+21 and 1.5e-7
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        format!("{}", n)
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// ObjectRef
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct HostObject {
    class: String,
    projections: BTreeMap<String, Value>,
    items: Vec<Value>,
}

/// Reference-identity handle to a host object (DOM node, collection, ...)
///
/// Two handles are equal only if they were cloned from the same
/// [`ObjectRef::new`] call.
#[derive(Debug, Clone)]
pub struct ObjectRef(Arc<HostObject>);

impl ObjectRef {
    /// Create a host object handle with the given accessor projections
    pub fn new<K, V>(class: impl Into<String>, projections: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self(Arc::new(HostObject {
            class: class.into(),
            projections: projections
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            items: Vec::new(),
        }))
    }

    /// Create an ordered collection (NodeList, HTMLCollection, array).
    /// `length` is projected from the number of items.
    pub fn collection(class: impl Into<String>, items: Vec<Value>) -> Self {
        let mut projections = BTreeMap::new();
        projections.insert("length".to_string(), Value::Number(items.len() as f64));
        Self(Arc::new(HostObject {
            class: class.into(),
            projections,
            items,
        }))
    }

    /// Host class name, e.g. `HTMLDivElement`
    pub fn class(&self) -> &str {
        &self.0.class
    }

    /// Read a projection; unknown accessors are undefined
    pub fn get(&self, accessor: &str) -> Value {
        self.0
            .projections
            .get(accessor)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Collection items (empty for non-collections)
    pub fn items(&self) -> &[Value] {
        &self.0.items
    }

    /// Reference identity
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

// ---------------------------------------------------------------------------
// Exception
// ---------------------------------------------------------------------------

/// Exception kinds the harness distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// Generic Error - user-thrown Error objects
    Error,
    /// TypeError - wrong type for operation
    TypeError,
    /// ReferenceError - undefined variable
    ReferenceError,
    /// RangeError - value out of range
    RangeError,
    /// SyntaxError - invalid syntax
    SyntaxError,
    /// EvalError - error in eval()
    EvalError,
    /// URIError - malformed URI
    UriError,
    /// DOMException, usually with a legacy numeric code
    DomException,
    /// Anything else the host throws
    Other(String),
}

impl ExceptionKind {
    /// Map a constructor name to a kind
    pub fn from_name(name: &str) -> Self {
        match name {
            "Error" => ExceptionKind::Error,
            "TypeError" => ExceptionKind::TypeError,
            "ReferenceError" => ExceptionKind::ReferenceError,
            "RangeError" => ExceptionKind::RangeError,
            "SyntaxError" => ExceptionKind::SyntaxError,
            "EvalError" => ExceptionKind::EvalError,
            "URIError" => ExceptionKind::UriError,
            "DOMException" => ExceptionKind::DomException,
            other => ExceptionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::Error => write!(f, "Error"),
            ExceptionKind::TypeError => write!(f, "TypeError"),
            ExceptionKind::ReferenceError => write!(f, "ReferenceError"),
            ExceptionKind::RangeError => write!(f, "RangeError"),
            ExceptionKind::SyntaxError => write!(f, "SyntaxError"),
            ExceptionKind::EvalError => write!(f, "EvalError"),
            ExceptionKind::UriError => write!(f, "URIError"),
            ExceptionKind::DomException => write!(f, "DOMException"),
            ExceptionKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Legacy DOMException codes (DOM Level 1-3)
pub mod dom_codes {
    pub const INDEX_SIZE_ERR: u16 = 1;
    pub const DOMSTRING_SIZE_ERR: u16 = 2;
    pub const HIERARCHY_REQUEST_ERR: u16 = 3;
    pub const WRONG_DOCUMENT_ERR: u16 = 4;
    pub const INVALID_CHARACTER_ERR: u16 = 5;
    pub const NO_DATA_ALLOWED_ERR: u16 = 6;
    pub const NO_MODIFICATION_ALLOWED_ERR: u16 = 7;
    pub const NOT_FOUND_ERR: u16 = 8;
    pub const NOT_SUPPORTED_ERR: u16 = 9;
    pub const INUSE_ATTRIBUTE_ERR: u16 = 10;
    pub const INVALID_STATE_ERR: u16 = 11;
    pub const SYNTAX_ERR: u16 = 12;
    pub const INVALID_MODIFICATION_ERR: u16 = 13;
    pub const NAMESPACE_ERR: u16 = 14;
    pub const INVALID_ACCESS_ERR: u16 = 15;
    pub const VALIDATION_ERR: u16 = 16;
    pub const TYPE_MISMATCH_ERR: u16 = 17;

    /// Symbolic name of a legacy code
    pub fn name(code: u16) -> Option<&'static str> {
        let name = match code {
            INDEX_SIZE_ERR => "INDEX_SIZE_ERR",
            DOMSTRING_SIZE_ERR => "DOMSTRING_SIZE_ERR",
            HIERARCHY_REQUEST_ERR => "HIERARCHY_REQUEST_ERR",
            WRONG_DOCUMENT_ERR => "WRONG_DOCUMENT_ERR",
            INVALID_CHARACTER_ERR => "INVALID_CHARACTER_ERR",
            NO_DATA_ALLOWED_ERR => "NO_DATA_ALLOWED_ERR",
            NO_MODIFICATION_ALLOWED_ERR => "NO_MODIFICATION_ALLOWED_ERR",
            NOT_FOUND_ERR => "NOT_FOUND_ERR",
            NOT_SUPPORTED_ERR => "NOT_SUPPORTED_ERR",
            INUSE_ATTRIBUTE_ERR => "INUSE_ATTRIBUTE_ERR",
            INVALID_STATE_ERR => "INVALID_STATE_ERR",
            SYNTAX_ERR => "SYNTAX_ERR",
            INVALID_MODIFICATION_ERR => "INVALID_MODIFICATION_ERR",
            NAMESPACE_ERR => "NAMESPACE_ERR",
            INVALID_ACCESS_ERR => "INVALID_ACCESS_ERR",
            VALIDATION_ERR => "VALIDATION_ERR",
            TYPE_MISMATCH_ERR => "TYPE_MISMATCH_ERR",
            _ => return None,
        };
        Some(name)
    }
}

/// An exception thrown by the host, with an explicit optional legacy code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: String,
    pub code: Option<u16>,
}

impl Exception {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    /// Create a ReferenceError
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ReferenceError, message)
    }

    /// Create a RangeError
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::RangeError, message)
    }

    /// Create a SyntaxError
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::SyntaxError, message)
    }

    /// Create a DOMException carrying a legacy code. The message follows the
    /// `NOT_FOUND_ERR: DOM Exception 8` shape older engines print.
    pub fn dom(code: u16) -> Self {
        let name = dom_codes::name(code).unwrap_or("UNKNOWN_ERR");
        Self {
            kind: ExceptionKind::DomException,
            message: format!("{}: DOM Exception {}", name, code),
            code: Some(code),
        }
    }

    /// Attach a legacy numeric code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Parse a host-printed `"Kind: message"` string. Strings without a
    /// recognizable prefix become a plain `Error`.
    pub fn parse(text: &str) -> Self {
        match text.split_once(": ") {
            Some((name, message))
                if !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                Self::new(ExceptionKind::from_name(name), message)
            }
            _ => match text {
                "Error" | "TypeError" | "ReferenceError" | "RangeError" | "SyntaxError"
                | "EvalError" | "URIError" | "DOMException" => {
                    Self::new(ExceptionKind::from_name(text), "")
                }
                _ => Self::new(ExceptionKind::Error, text),
            },
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Exception {}
