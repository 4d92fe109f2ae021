//! A tiny expression evaluator standing in for a real engine
//!
//! Understands literals (`1.5`, `0x1f`, `'str'`, `true`, `null`,
//! `undefined`, `NaN`, `Infinity`), unary `- + ! typeof`, binary
//! `* / % + -`, equality `=== !== == !=`, parentheses, member access and
//! named bindings. Member access on `null`/`undefined` throws a TypeError,
//! unknown names throw a ReferenceError, malformed input a SyntaxError.

use super::Host;
use crate::value::{same_value, Completion, Exception, ObjectRef, Value};
use std::collections::HashMap;
use std::fmt;

/// What a name resolves to
pub enum Binding {
    /// A fixed value
    Value(Value),
    /// A getter evaluated on every reference; may throw
    Thunk(Box<dyn FnMut() -> Completion>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Binding::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

/// Literal/arithmetic host with a table of named bindings
#[derive(Debug, Default)]
pub struct ExpressionHost {
    bindings: HashMap<String, Binding>,
}

impl ExpressionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a value
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bindings.insert(name.into(), Binding::Value(value.into()));
        self
    }

    /// Bind a name to a host object
    pub fn define_object(&mut self, name: impl Into<String>, object: ObjectRef) -> &mut Self {
        self.bindings.insert(name.into(), Binding::Value(Value::Object(object)));
        self
    }

    /// Bind a name to a getter
    pub fn define_thunk<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnMut() -> Completion + 'static,
    {
        self.bindings.insert(name.into(), Binding::Thunk(Box::new(f)));
        self
    }

    fn lookup(&mut self, name: &str) -> Completion {
        match name {
            "undefined" => return Ok(Value::Undefined),
            "null" => return Ok(Value::Null),
            "true" => return Ok(Value::Boolean(true)),
            "false" => return Ok(Value::Boolean(false)),
            "NaN" => return Ok(Value::Number(f64::NAN)),
            "Infinity" => return Ok(Value::Number(f64::INFINITY)),
            _ => {}
        }
        match self.bindings.get_mut(name) {
            Some(Binding::Value(v)) => Ok(v.clone()),
            Some(Binding::Thunk(f)) => f(),
            None => Err(Exception::reference_error(format!("'{}' is not defined", name))),
        }
    }
}

impl Host for ExpressionHost {
    fn evaluate(&mut self, source: &str) -> Completion {
        let tokens = tokenize(source)?;
        let mut parser = Evaluator {
            host: self,
            tokens,
            pos: 0,
            depth: 0,
        };
        let value = parser.expression()?;
        match parser.peek() {
            Token::Eof => Ok(value),
            other => Err(unexpected(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", Value::Number(*n)),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Punct(p) => write!(f, "{}", p),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn unexpected(token: &Token) -> Exception {
    match token {
        Token::Eof => Exception::syntax_error("Unexpected end of input"),
        other => Exception::syntax_error(format!("Unexpected token {}", other)),
    }
}

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "(", ")", ".", "+", "-", "*", "/", "%", "!",
];

fn is_id_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_start(c)
}

fn is_id_continue(c: char) -> bool {
    c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_continue(c)
}

fn tokenize(source: &str) -> Result<Vec<Token>, Exception> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    'outer: while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit())) {
            let (n, next) = scan_number(&chars, pos)?;
            tokens.push(Token::Number(n));
            pos = next;
            continue;
        }

        if c == '\'' || c == '"' {
            let (s, next) = scan_string(&chars, pos)?;
            tokens.push(Token::Str(s));
            pos = next;
            continue;
        }

        if is_id_start(c) {
            let start = pos;
            while pos < chars.len() && is_id_continue(chars[pos]) {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        for punct in PUNCTUATORS {
            let len = punct.len();
            if pos + len <= chars.len() && chars[pos..pos + len].iter().copied().eq(punct.chars()) {
                tokens.push(Token::Punct(punct));
                pos += len;
                continue 'outer;
            }
        }

        return Err(Exception::syntax_error(format!("Invalid character '{}'", c)));
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn scan_number(chars: &[char], start: usize) -> Result<(f64, usize), Exception> {
    let mut pos = start;

    if chars[pos] == '0' && matches!(chars.get(pos + 1), Some('x') | Some('X')) {
        pos += 2;
        let digits_start = pos;
        while pos < chars.len() && chars[pos].is_ascii_hexdigit() {
            pos += 1;
        }
        let digits: String = chars[digits_start..pos].iter().collect();
        return u64::from_str_radix(&digits, 16)
            .map(|n| (n as f64, pos))
            .map_err(|_| Exception::syntax_error("Invalid hexadecimal literal"));
    }

    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        pos += 1;
        if pos < chars.len() && (chars[pos] == '+' || chars[pos] == '-') {
            pos += 1;
        }
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let text: String = chars[start..pos].iter().collect();
    text.parse::<f64>()
        .map(|n| (n, pos))
        .map_err(|_| Exception::syntax_error(format!("Invalid number literal {}", text)))
}

fn scan_string(chars: &[char], start: usize) -> Result<(String, usize), Exception> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut out = String::new();
    while pos < chars.len() {
        match chars[pos] {
            c if c == quote => return Ok((out, pos + 1)),
            '\\' => {
                pos += 1;
                match chars.get(pos) {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c) => out.push(*c),
                    None => break,
                }
            }
            c => out.push(c),
        }
        pos += 1;
    }
    Err(Exception::syntax_error("Unterminated string literal"))
}

// ---------------------------------------------------------------------------
// Evaluator (recursive descent, evaluates while parsing)
// ---------------------------------------------------------------------------

/// Deepest nesting of parentheses and unary operators accepted
const MAX_NESTING: usize = 256;

struct Evaluator<'h> {
    host: &'h mut ExpressionHost,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Evaluator<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Token::Punct(p) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Completion {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Punct(p @ ("===" | "!==" | "==" | "!=")) => *p,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.additive()?;
            let result = match op {
                "===" => strict_equals(&left, &right),
                "!==" => !strict_equals(&left, &right),
                "==" => loose_equals(&left, &right),
                _ => !loose_equals(&left, &right),
            };
            left = Value::Boolean(result);
        }
    }

    fn additive(&mut self) -> Completion {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat("+") {
                let right = self.multiplicative()?;
                left = add(&left, &right);
            } else if self.eat("-") {
                let right = self.multiplicative()?;
                left = Value::Number(to_number(&left) - to_number(&right));
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> Completion {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Punct(p @ ("*" | "/" | "%")) => *p,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            let (a, b) = (to_number(&left), to_number(&right));
            left = Value::Number(match op {
                "*" => a * b,
                "/" => a / b,
                _ => a % b,
            });
        }
    }

    fn unary(&mut self) -> Completion {
        if self.depth >= MAX_NESTING {
            return Err(Exception::range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        let result = self.prefixed();
        self.depth -= 1;
        result
    }

    fn prefixed(&mut self) -> Completion {
        if self.eat("-") {
            return Ok(Value::Number(-to_number(&self.unary()?)));
        }
        if self.eat("+") {
            return Ok(Value::Number(to_number(&self.unary()?)));
        }
        if self.eat("!") {
            return Ok(Value::Boolean(!self.unary()?.to_boolean()));
        }
        if matches!(self.peek(), Token::Ident(name) if name == "typeof") {
            self.bump();
            // typeof tolerates unresolvable names
            return match self.unary() {
                Ok(v) => Ok(Value::from(v.type_of())),
                Err(e) if e.kind == crate::value::ExceptionKind::ReferenceError => {
                    Ok(Value::from("undefined"))
                }
                Err(e) => Err(e),
            };
        }
        self.member()
    }

    fn member(&mut self) -> Completion {
        let mut value = self.primary()?;
        while self.eat(".") {
            let name = match self.bump() {
                Token::Ident(name) => name,
                other => return Err(unexpected(&other)),
            };
            if value.is_nullish() {
                return Err(Exception::type_error(format!(
                    "Cannot read property '{}' of {}",
                    name, value
                )));
            }
            value = value.project(&name);
        }
        Ok(value)
    }

    fn primary(&mut self) -> Completion {
        match self.bump() {
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::Ident(name) => self.host.lookup(&name),
            Token::Punct("(") => {
                let value = self.expression()?;
                if self.eat(")") {
                    Ok(value)
                } else {
                    Err(unexpected(self.peek()))
                }
            }
            other => Err(unexpected(&other)),
        }
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Exception(_) | Value::Object(_) => f64::NAN,
    }
}

/// `Number(string)`: decimal literals, `Infinity` and unsigned
/// `0x`/`0o`/`0b` integers. Anything else is NaN.
fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return digits.chars().try_fold(0.0, |acc, c| {
                c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
            })
            .unwrap_or(f64::NAN);
        }
    }

    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    if unsigned == "Infinity" {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    // str::parse also takes "inf" and "nan", which Number() rejects
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) | (Value::Object(_), _) | (_, Value::Object(_)) => {
            Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
        }
        _ => Value::Number(to_number(left) + to_number(right)),
    }
}

fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => same_value(a, b),
    }
}

fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        _ if a.type_of() == b.type_of() => strict_equals(a, b),
        (Value::Object(_), _) | (_, Value::Object(_)) => {
            a.to_js_string() == b.to_js_string()
        }
        _ => to_number(a) == to_number(b),
    }
}
