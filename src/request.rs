//! Incoming HTTP request type.
//!
//! The body, query string and cookies are decoded exactly once, when the
//! request is built. Field extractors then only ever borrow.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::Error;

/// An incoming HTTP request with its fields already decoded.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_body: Bytes,
    body: Value,
    query: Value,
    cookies: Value,
}

impl Request {
    /// Decodes an [`http::Request`] into a `Request`.
    ///
    /// Body decoding follows the `content-type` header:
    ///
    /// | content-type | `body()` |
    /// |---|---|
    /// | `application/json`, `*+json` | parsed JSON value |
    /// | `application/x-www-form-urlencoded` | mapping, same shape as `query()` |
    /// | `text/*` | string |
    /// | empty body or anything else | `null` |
    ///
    /// A body that claims to be JSON or a form but does not decode is an
    /// [`Error`]; that is a broken client or proxy, not a validation failure.
    pub fn from_http(req: http::Request<Bytes>) -> Result<Self, Error> {
        let (parts, raw_body) = req.into_parts();

        let body = decode_body(&parts.headers, &raw_body)?;
        let query = parse_pairs(parts.uri.query().unwrap_or_default().as_bytes());
        let cookies = parse_cookies(&parts.headers);

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            raw_body,
            body,
            query,
            cookies,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// The decoded body. `null` when the request had no (usable) body.
    pub fn body(&self) -> &Value { &self.body }

    /// The undecoded body bytes.
    pub fn raw_body(&self) -> &Bytes { &self.raw_body }

    /// Query parameters as a mapping. Repeated keys collect into an array.
    pub fn query(&self) -> &Value { &self.query }

    /// Cookies as a mapping of name to percent-decoded value.
    pub fn cookies(&self) -> &Value { &self.cookies }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn decode_body(headers: &HeaderMap, raw: &Bytes) -> Result<Value, Error> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        Ok(serde_json::from_slice(raw)?)
    } else if mime == "application/x-www-form-urlencoded" {
        std::str::from_utf8(raw)?;
        Ok(parse_pairs(raw))
    } else if mime.starts_with("text/") {
        Ok(Value::String(String::from_utf8_lossy(raw).into_owned()))
    } else {
        trace!(content_type = %mime, "body left undecoded");
        Ok(Value::Null)
    }
}

/// Parses `a=1&b=2&a=3` into `{"a": ["1", "3"], "b": "2"}`.
fn parse_pairs(input: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        insert_repeated(&mut map, key.into_owned(), value.into_owned());
    }
    Value::Object(map)
}

fn insert_repeated(map: &mut Map<String, Value>, key: String, value: String) {
    match map.get_mut(&key) {
        Some(Value::Array(values)) => values.push(Value::String(value)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        None => {
            map.insert(key, Value::String(value));
        }
    }
}

/// Parses every `Cookie` header. The first occurrence of a name wins, which
/// matches what browsers send first: the most specific path.
fn parse_cookies(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    let pairs = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='));

    for (name, value) in pairs {
        let name = name.trim();
        if name.is_empty() || map.contains_key(name) {
            continue;
        }
        let value = value.trim().trim_matches('"');
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_owned());
        map.insert(name.to_owned(), Value::String(value));
    }
    Value::Object(map)
}
