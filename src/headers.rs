//! Lazily enumerated, case-insensitive header access.
//!
//! A [`HeaderMap`] is looked up by name; it is not a plain mapping a schema can
//! walk. [`HeaderAccessor`] bridges the two: it answers `get(name)` lookups,
//! remembers which names were found, and materializes exactly those names
//! with [`snapshot_accessed`](HeaderAccessor::snapshot_accessed).
//!
//! `&HeaderAccessor` is also a serde [`Deserializer`]:
//!
//! - a struct asks for its declared fields, and only those are looked up;
//! - an open map (`HashMap`, `serde_json::Value`, `#[serde(flatten)]`) sees
//!   only the names that were already looked up, which is usually none.
//!
//! So a schema that needs *every* header cannot be expressed. Name the
//! headers you care about as struct fields.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;

use http::HeaderMap;
use serde::de::value::{SeqDeserializer, StringDeserializer};
use serde::de::{self, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use crate::validation::Issue;

/// Records which headers a schema consulted.
pub struct HeaderAccessor<'a> {
    headers: &'a HeaderMap,
    accessed: RefCell<Vec<String>>,
}

impl<'a> HeaderAccessor<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers, accessed: RefCell::new(Vec::new()) }
    }

    /// Case-insensitive lookup of `name`.
    ///
    /// A header sent on several lines reads as one value, the lines joined
    /// with `", "`. A found name is recorded lowercased. Absent headers and
    /// invalid names read as `None` and are not recorded; so does a header
    /// whose every line is non-UTF-8.
    pub fn get(&self, name: &str) -> Option<Cow<'a, str>> {
        let value = self.lookup(name)?;
        let name = name.to_ascii_lowercase();
        let mut accessed = self.accessed.borrow_mut();
        if !accessed.contains(&name) {
            accessed.push(name);
        }
        Some(value)
    }

    /// Names found so far, in first-access order.
    pub fn accessed(&self) -> Vec<String> {
        self.accessed.borrow().clone()
    }

    /// A plain mapping of every accessed name to its value.
    pub fn snapshot_accessed(&self) -> Map<String, Value> {
        self.accessed
            .borrow()
            .iter()
            .filter_map(|name| {
                let value = self.lookup(name)?;
                Some((name.clone(), Value::String(value.into_owned())))
            })
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<Cow<'a, str>> {
        let mut lines = self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok());
        let first = lines.next()?;
        match lines.next() {
            None => Some(Cow::Borrowed(first)),
            Some(second) => {
                let mut joined = format!("{first}, {second}");
                for line in lines {
                    joined.push_str(", ");
                    joined.push_str(line);
                }
                Some(Cow::Owned(joined))
            }
        }
    }
}

impl fmt::Debug for HeaderAccessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderAccessor")
            .field("accessed", &self.accessed.borrow())
            .finish_non_exhaustive()
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// Deserialization failure while reading headers, located by header name.
#[derive(Debug)]
pub struct HeaderError {
    path: Vec<String>,
    message: String,
}

impl HeaderError {
    fn within(mut self, name: &str) -> Self {
        self.path.insert(0, name.to_owned());
        self
    }
}

impl de::Error for HeaderError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self { path: Vec::new(), message: msg.to_string() }
    }

    fn missing_field(field: &'static str) -> Self {
        Self { path: vec![field.to_owned()], message: "required header is missing".to_owned() }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path.as_slice() {
            [] => f.write_str(&self.message),
            path => write!(f, "{}: {}", path.join("."), self.message),
        }
    }
}

impl std::error::Error for HeaderError {}

impl From<HeaderError> for Issue {
    fn from(e: HeaderError) -> Self {
        Issue::new(e.path, e.message)
    }
}

// ── Accessor as a map ─────────────────────────────────────────────────────────

impl<'de> Deserializer<'de> for &HeaderAccessor<'de> {
    type Error = HeaderError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let names = self.accessed();
        visitor.visit_map(Entries::new(self, names))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let names = fields.iter().map(|f| (*f).to_owned()).collect();
        visitor.visit_map(Entries::new(self, names))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct enum identifier
        ignored_any
    }
}

/// Walks a list of candidate names, yielding those that are present.
struct Entries<'b, 'de> {
    accessor: &'b HeaderAccessor<'de>,
    names: std::vec::IntoIter<String>,
    pending: Option<(String, Cow<'de, str>)>,
}

impl<'b, 'de> Entries<'b, 'de> {
    fn new(accessor: &'b HeaderAccessor<'de>, names: Vec<String>) -> Self {
        Self { accessor, names: names.into_iter(), pending: None }
    }
}

impl<'de> MapAccess<'de> for Entries<'_, 'de> {
    type Error = HeaderError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        for name in self.names.by_ref() {
            if let Some(value) = self.accessor.get(&name) {
                let key: StringDeserializer<HeaderError> = name.clone().into_deserializer();
                self.pending = Some((name, value));
                return seed.deserialize(key).map(Some);
            }
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        let (name, value) = self
            .pending
            .take()
            .ok_or_else(|| <HeaderError as de::Error>::custom("header value requested before its name"))?;
        seed.deserialize(ValueDeserializer(value)).map_err(|e| e.within(&name))
    }
}

// ── Single header value ───────────────────────────────────────────────────────

/// One header value: a string that parses into scalars on demand and splits
/// on commas when a sequence is asked for.
struct ValueDeserializer<'de>(Cow<'de, str>);

macro_rules! parse_scalar {
    ($($method:ident => $visit:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0.trim().parse() {
                Ok(value) => visitor.$visit(value),
                Err(e) => Err(de::Error::custom(format_args!("invalid value `{}`: {e}", self.0))),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for ValueDeserializer<'de> {
    type Error = HeaderError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Cow::Borrowed(value) => visitor.visit_borrowed_str(value),
            Cow::Owned(value) => visitor.visit_string(value),
        }
    }

    parse_scalar! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let items: Vec<ValueDeserializer<'de>> = match self.0 {
            Cow::Borrowed(value) => {
                value.split(',').map(|item| ValueDeserializer(Cow::Borrowed(item.trim()))).collect()
            }
            Cow::Owned(value) => value
                .split(',')
                .map(|item| ValueDeserializer(Cow::Owned(item.trim().to_owned())))
                .collect(),
        };
        SeqDeserializer::<_, HeaderError>::new(items.into_iter()).deserialize_any(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        IntoDeserializer::<'de, HeaderError>::into_deserializer(self.0)
            .deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit unit_struct tuple tuple_struct
        map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, HeaderError> for ValueDeserializer<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, http::HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn get_records_found_names_once() {
        let map = headers(&[("foo", "bar"), ("x-other", "1")]);
        let accessor = HeaderAccessor::new(&map);

        assert_eq!(accessor.get("FOO").as_deref(), Some("bar"));
        assert_eq!(accessor.get("foo").as_deref(), Some("bar"));
        assert_eq!(accessor.get("Foo").as_deref(), Some("bar"));
        assert_eq!(accessor.get("missing"), None);
        assert_eq!(accessor.accessed(), vec!["foo".to_owned()]);

        let snapshot = accessor.snapshot_accessed();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["foo"], "bar");
    }

    #[test]
    fn invalid_names_read_as_absent() {
        let map = headers(&[("foo", "bar")]);
        let accessor = HeaderAccessor::new(&map);
        assert_eq!(accessor.get("not a header"), None);
        assert!(accessor.accessed().is_empty());
    }

    #[test]
    fn repeated_lines_join_into_one_value() {
        let map = headers(&[("x-tag", "a"), ("x-tag", "b, c"), ("x-one", "1")]);
        let accessor = HeaderAccessor::new(&map);

        assert_eq!(accessor.get("x-tag").as_deref(), Some("a, b, c"));
        assert!(matches!(accessor.get("x-one"), Some(Cow::Borrowed("1"))));
        assert_eq!(accessor.snapshot_accessed()["x-tag"], "a, b, c");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "kebab-case")]
    struct Wanted {
        content_length: u64,
        x_tags: Vec<String>,
        x_debug: Option<bool>,
    }

    #[test]
    fn struct_reads_only_declared_fields() {
        let map = headers(&[
            ("content-length", "42"),
            ("x-tags", "a, b,c"),
            ("authorization", "secret"),
        ]);
        let accessor = HeaderAccessor::new(&map);

        let wanted = Wanted::deserialize(&accessor).unwrap();
        assert_eq!(
            wanted,
            Wanted { content_length: 42, x_tags: vec!["a".into(), "b".into(), "c".into()], x_debug: None },
        );
        assert_eq!(accessor.accessed(), vec!["content-length".to_owned(), "x-tags".to_owned()]);
    }

    #[test]
    fn repeated_list_header_keeps_every_line() {
        let map = headers(&[("content-length", "1"), ("x-tags", "a"), ("x-tags", "b")]);
        let accessor = HeaderAccessor::new(&map);

        let wanted = Wanted::deserialize(&accessor).unwrap();
        assert_eq!(wanted.x_tags, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn bad_scalar_is_located_by_header() {
        let map = headers(&[("content-length", "lots"), ("x-tags", "a")]);
        let accessor = HeaderAccessor::new(&map);

        let err = Wanted::deserialize(&accessor).unwrap_err();
        let issue = Issue::from(err);
        assert_eq!(issue.path, vec!["content-length".to_owned()]);
        assert!(issue.message.starts_with("invalid value `lots`"));
    }

    #[test]
    fn missing_required_header_is_located() {
        let map = headers(&[("x-tags", "a")]);
        let accessor = HeaderAccessor::new(&map);

        let issue = Issue::from(Wanted::deserialize(&accessor).unwrap_err());
        assert_eq!(issue.path, vec!["content-length".to_owned()]);
    }

    #[test]
    fn open_map_only_sees_accessed_names() {
        let map = headers(&[("foo", "bar"), ("baz", "qux")]);
        let accessor = HeaderAccessor::new(&map);

        let all = HashMap::<String, String>::deserialize(&accessor).unwrap();
        assert!(all.is_empty());

        accessor.get("baz");
        let seen = HashMap::<String, String>::deserialize(&accessor).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen["baz"], "qux");
    }
}
