//! Schemas: the "safe parse" capability a field is validated against.
//!
//! Validation itself is serde's job. [`Typed<T>`] accepts a field exactly when
//! `T: Deserialize` accepts it; everything a derive can express (literal
//! values via unit enum variants, optional keys, renames, `deny_unknown_fields`)
//! is available. [`SchemaExt::refine`] layers extra predicates on top.
//!
//! Issues are located: a bad value at `body.items[1].n` is reported at
//! `["items", "1", "n"]`, a missing key at the object that lacks it.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;

use crate::headers::HeaderAccessor;
use crate::validation::{Issue, ValidationError};

/// The raw, unvalidated value of a request field.
#[derive(Debug)]
pub enum Input<'r> {
    /// A plain, already-decoded value: body, query or cookies.
    Value(&'r Value),
    /// A lookup-only header map.
    Headers(HeaderAccessor<'r>),
}

impl Input<'_> {
    /// Materializes the input into a plain value.
    ///
    /// For headers this is the snapshot of accessed names, so it only holds
    /// what a schema has already looked up.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => (*value).clone(),
            Self::Headers(accessor) => Value::Object(accessor.snapshot_accessed()),
        }
    }
}

/// Accepts or rejects a field, producing an owned, typed value.
///
/// Outputs are `'static`: a parsed value never borrows from the request it
/// came from.
pub trait Schema: Send + Sync {
    type Output: Send + 'static;

    fn safe_parse(&self, input: Input<'_>) -> Result<Self::Output, ValidationError>;
}

// ── Typed ────────────────────────────────────────────────────────────────────

/// A schema backed by `T`'s `Deserialize` implementation.
pub struct Typed<T>(PhantomData<fn() -> T>);

/// Shorthand for [`Typed::new`].
pub fn typed<T: DeserializeOwned + Send + 'static>() -> Typed<T> {
    Typed::new()
}

impl<T> Typed<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for Typed<T> {}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned + Send + 'static> Schema for Typed<T> {
    type Output = T;

    fn safe_parse(&self, input: Input<'_>) -> Result<T, ValidationError> {
        match input {
            Input::Value(value) => serde_path_to_error::deserialize(value).map_err(|e| {
                let path = e.path().iter().filter_map(segment_name).collect();
                Issue::new(path, e.into_inner().to_string()).into()
            }),
            Input::Headers(accessor) => {
                T::deserialize(&accessor).map_err(|e| Issue::from(e).into())
            }
        }
    }
}

/// `None` for segments serde could not name, such as untagged enum arms.
fn segment_name(segment: &Segment) -> Option<String> {
    match segment {
        Segment::Seq { index } => Some(index.to_string()),
        Segment::Map { key } => Some(key.clone()),
        Segment::Enum { variant } => Some(variant.clone()),
        Segment::Unknown => None,
    }
}

// ── Refined ──────────────────────────────────────────────────────────────────

/// A schema whose accepted output must also satisfy a predicate.
///
/// Built with [`SchemaExt::refine`].
pub struct Refined<S, F> {
    inner: S,
    check: F,
    path: Vec<String>,
    message: String,
}

impl<S, F> Refined<S, F> {
    /// Reports a failed check at `path` inside the field instead of at its root.
    pub fn at<I, P>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }
}

impl<S, F> Schema for Refined<S, F>
where
    S: Schema,
    F: Fn(&S::Output) -> bool + Send + Sync,
{
    type Output = S::Output;

    fn safe_parse(&self, input: Input<'_>) -> Result<S::Output, ValidationError> {
        let value = self.inner.safe_parse(input)?;
        if (self.check)(&value) {
            Ok(value)
        } else {
            Err(Issue::new(self.path.clone(), self.message.clone()).into())
        }
    }
}

/// Combinators available on every [`Schema`].
pub trait SchemaExt: Schema + Sized {
    /// Rejects outputs for which `check` returns `false`, with `message`.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use tsu_fields::schema::{self, Input, Schema, SchemaExt};
    ///
    /// let adult = schema::typed::<u8>().refine(|age| *age >= 18, "must be an adult");
    ///
    /// assert_eq!(adult.safe_parse(Input::Value(&json!(30))).unwrap(), 30);
    /// let err = adult.safe_parse(Input::Value(&json!(12))).unwrap_err();
    /// assert_eq!(err.issues()[0].message, "must be an adult");
    /// ```
    fn refine<F>(self, check: F, message: impl Into<String>) -> Refined<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync,
    {
        Refined { inner: self, check, path: Vec::new(), message: message.into() }
    }
}

impl<S: Schema> SchemaExt for S {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use http::HeaderMap;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Bar {
        #[serde(rename = "bar")]
        Bar,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        foo: Bar,
    }

    #[test]
    fn typed_accepts_and_rejects_plain_values() {
        let schema = typed::<Foo>();
        assert_eq!(schema.safe_parse(Input::Value(&json!({ "foo": "bar" }))).unwrap(), Foo { foo: Bar::Bar });

        let err = schema.safe_parse(Input::Value(&json!({ "foo": "BAR" }))).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, vec!["foo".to_owned()]);
        assert!(err.issues()[0].message.starts_with("unknown variant `BAR`"));
    }

    #[test]
    fn value_issues_are_located_inside_the_field() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Item {
            n: u32,
        }

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Order {
            items: Vec<Item>,
        }

        let err = typed::<Order>()
            .safe_parse(Input::Value(&json!({ "items": [{ "n": 1 }, { "n": "x" }] })))
            .unwrap_err();
        assert_eq!(err.issues()[0].path, vec!["items".to_owned(), "1".to_owned(), "n".to_owned()]);

        let tree = err.format();
        assert_eq!(tree["_errors"], json!([]));
        assert_eq!(tree["items"]["1"]["n"]["_errors"].as_array().unwrap().len(), 1);

        // Missing keys are reported by the struct that owns them.
        let err = typed::<Order>().safe_parse(Input::Value(&json!({}))).unwrap_err();
        assert!(err.issues()[0].path.is_empty());
        assert_eq!(err.issues()[0].message, "missing field `items`");
    }

    #[test]
    fn null_reaches_the_schema_unchanged() {
        assert_eq!(typed::<Option<Foo>>().safe_parse(Input::Value(&Value::Null)).unwrap(), None);
        assert!(typed::<Foo>().safe_parse(Input::Value(&Value::Null)).is_err());
    }

    #[test]
    fn typed_reads_headers_through_the_accessor() {
        let mut map = HeaderMap::new();
        map.insert("foo", "bar".parse().unwrap());
        map.insert("other", "x".parse().unwrap());

        let parsed = typed::<Foo>().safe_parse(Input::Headers(HeaderAccessor::new(&map))).unwrap();
        assert_eq!(parsed, Foo { foo: Bar::Bar });

        let open = typed::<HashMap<String, String>>()
            .safe_parse(Input::Headers(HeaderAccessor::new(&map)))
            .unwrap();
        assert!(open.is_empty());
    }

    #[test]
    fn header_issue_keeps_its_path() {
        let mut map = HeaderMap::new();
        map.insert("foo", "BAR".parse().unwrap());

        let err = typed::<Foo>().safe_parse(Input::Headers(HeaderAccessor::new(&map))).unwrap_err();
        assert_eq!(err.issues()[0].path, vec!["foo".to_owned()]);
        assert_eq!(err.format()["foo"]["_errors"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn refine_reports_at_path() {
        #[derive(Deserialize)]
        struct Range {
            lo: u32,
            hi: u32,
        }

        let schema = typed::<Range>().refine(|r| r.lo <= r.hi, "lo exceeds hi").at(["lo"]);
        assert!(schema.safe_parse(Input::Value(&json!({ "lo": 1, "hi": 2 }))).is_ok());

        let err = schema.safe_parse(Input::Value(&json!({ "lo": 3, "hi": 2 }))).err().unwrap();
        assert_eq!(err.format(), json!({ "_errors": [], "lo": { "_errors": ["lo exceeds hi"] } }));
    }

    #[test]
    fn to_value_materializes_accessed_headers() {
        let mut map = HeaderMap::new();
        map.insert("foo", "bar".parse().unwrap());
        map.insert("baz", "qux".parse().unwrap());

        let input = Input::Headers(HeaderAccessor::new(&map));
        assert_eq!(input.to_value(), json!({}));
        if let Input::Headers(accessor) = &input {
            accessor.get("baz");
        }
        assert_eq!(input.to_value(), json!({ "baz": "qux" }));
        assert_eq!(Input::Value(&json!([1])).to_value(), json!([1]));
    }
}
