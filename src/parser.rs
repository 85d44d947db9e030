//! Framework-independent parse-or-stop steps.
//!
//! A [`FieldParser`] pairs an extractor (how to read one field out of some
//! request type) with the field's name. From it you build [`ParseStep`]s:
//!
//! ```text
//! FieldParser::new(extract, Field::Body)
//!        ↓ .with_default(schema)              or .with_handler(schema, handler)
//! ParseStep                                    ← a Middleware<Req>
//!        ↓ step.call(&req)
//! extract(req) → schema.safe_parse(input) ─ Ok  → Continue(Parsed { body: value })
//!                                         └ Err → Stop(handler.handle(field, error))
//! ```
//!
//! Nothing here knows about [`Request`](crate::Request); the crate's own
//! binding lives in [`bind`](crate::bind).

use std::fmt;

use serde::Serialize;
use serde::ser::SerializeMap;
use tracing::{debug, trace};

use crate::error::Error;
use crate::middleware::{Middleware, Outcome};
use crate::response::Response;
use crate::schema::{Input, Schema};
use crate::validation::ValidationError;

// ── Field ─────────────────────────────────────────────────────────────────────

/// The request part a step validates. Also the key its result is stored under.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Body,
    Query,
    Headers,
    Cookies,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body    => "body",
            Self::Query   => "query",
            Self::Headers => "headers",
            Self::Cookies => "cookies",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Parsed ────────────────────────────────────────────────────────────────────

/// The `Continue` payload of a [`ParseStep`]: one field name, one value.
///
/// Serializes as a single-entry map, `{"body": …}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    field: Field,
    value: T,
}

impl<T> Parsed<T> {
    pub fn new(field: Field, value: T) -> Self {
        Self { field, value }
    }

    pub fn field(&self) -> Field { self.field }
    pub fn key(&self) -> &'static str { self.field.as_str() }
    pub fn value(&self) -> &T { &self.value }
    pub fn into_value(self) -> T { self.value }
    pub fn into_parts(self) -> (Field, T) { (self.field, self.value) }
}

impl<T: Serialize> Serialize for Parsed<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key(), &self.value)?;
        map.end()
    }
}

// ── Extract ───────────────────────────────────────────────────────────────────

/// Reads one raw field out of a request of type `Req`.
///
/// Implemented for every `fn(&Req) -> Result<Input<'_>, Error>`. An `Err` is
/// an integration failure and propagates out of the step untouched.
pub trait Extract<Req>: Send + Sync {
    fn extract<'r>(&self, req: &'r Req) -> Result<Input<'r>, Error>;
}

impl<Req, F> Extract<Req> for F
where
    F: for<'r> Fn(&'r Req) -> Result<Input<'r>, Error> + Send + Sync,
{
    fn extract<'r>(&self, req: &'r Req) -> Result<Input<'r>, Error> {
        self(req)
    }
}

// ── Error handlers ────────────────────────────────────────────────────────────

/// Turns a rejected field into the response that stops the pipeline.
///
/// Any `Fn(ValidationError) -> R` is an error handler; the field name is only
/// available to handlers that implement the trait directly.
pub trait ErrorHandler: Send + Sync {
    type Response;

    fn handle(&self, field: Field, error: ValidationError) -> Self::Response;
}

impl<F, R> ErrorHandler for F
where
    F: Fn(ValidationError) -> R + Send + Sync,
{
    type Response = R;

    fn handle(&self, _field: Field, error: ValidationError) -> R {
        self(error)
    }
}

/// The default handler: `400 Bad Request` whose JSON body is the formatted
/// error tree ([`ValidationError::format`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct BadRequest;

impl ErrorHandler for BadRequest {
    type Response = Response;

    fn handle(&self, _field: Field, error: ValidationError) -> Response {
        Response::bad_request(&error.format())
    }
}

/// `400 Bad Request` whose JSON body names the field and embeds the raw
/// issues: `{"type": "body", "error": {"issues": [...]}}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BadRequestEnvelope;

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    field: Field,
    error: &'a ValidationError,
}

impl ErrorHandler for BadRequestEnvelope {
    type Response = Response;

    fn handle(&self, field: Field, error: ValidationError) -> Response {
        Response::bad_request(&Envelope { field, error: &error })
    }
}

// ── FieldParser ───────────────────────────────────────────────────────────────

/// Builds parse steps for one named field.
///
/// Holds only immutable configuration, so steps built from it may run for
/// any number of concurrent requests.
#[derive(Clone, Copy)]
pub struct FieldParser<E> {
    extract: E,
    field: Field,
}

impl<E> FieldParser<E> {
    pub const fn new(extract: E, field: Field) -> Self {
        Self { extract, field }
    }

    pub fn field(&self) -> Field { self.field }

    /// A step that stops with whatever `handler` makes of the error.
    pub fn with_handler<S, H>(&self, schema: S, handler: H) -> ParseStep<E, S, H>
    where
        E: Clone,
        S: Schema,
        H: ErrorHandler,
    {
        ParseStep { extract: self.extract.clone(), field: self.field, schema, handler }
    }

    /// A step that stops with [`BadRequest`].
    pub fn with_default<S>(&self, schema: S) -> ParseStep<E, S, BadRequest>
    where
        E: Clone,
        S: Schema,
    {
        self.with_handler(schema, BadRequest)
    }
}

impl<E> fmt::Debug for FieldParser<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldParser").field("field", &self.field).finish_non_exhaustive()
    }
}

/// Field parser for a request body.
pub const fn body<E>(extract: E) -> FieldParser<E> { FieldParser::new(extract, Field::Body) }
/// Field parser for a query string.
pub const fn query<E>(extract: E) -> FieldParser<E> { FieldParser::new(extract, Field::Query) }
/// Field parser for headers; `extract` should hand out [`Input::Headers`].
pub const fn headers<E>(extract: E) -> FieldParser<E> { FieldParser::new(extract, Field::Headers) }
/// Field parser for cookies.
pub const fn cookies<E>(extract: E) -> FieldParser<E> { FieldParser::new(extract, Field::Cookies) }

// ── ParseStep ─────────────────────────────────────────────────────────────────

/// Extracts a field, validates it, and continues or stops.
pub struct ParseStep<E, S, H> {
    extract: E,
    field: Field,
    schema: S,
    handler: H,
}

impl<E, S, H> ParseStep<E, S, H> {
    pub fn field(&self) -> Field { self.field }
}

impl<Req, E, S, H> Middleware<Req> for ParseStep<E, S, H>
where
    E: Extract<Req>,
    S: Schema,
    H: ErrorHandler,
{
    type Output = Parsed<S::Output>;
    type Response = H::Response;

    fn call(&self, req: &Req) -> Result<Outcome<Self::Output, Self::Response>, Error> {
        let input = self.extract.extract(req)?;

        match self.schema.safe_parse(input) {
            Ok(value) => {
                trace!(field = %self.field, "request field accepted");
                Ok(Outcome::Continue(Parsed::new(self.field, value)))
            }
            Err(error) => {
                debug!(field = %self.field, issues = error.issues().len(), "request field rejected");
                Ok(Outcome::Stop(self.handler.handle(self.field, error)))
            }
        }
    }
}

impl<E, S, H> fmt::Debug for ParseStep<E, S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseStep").field("field", &self.field).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::schema::typed;

    /// A request shape this module has never heard of.
    struct Mock {
        the_key: Value,
    }

    fn get_the_key(req: &Mock) -> Result<Input<'_>, Error> {
        Ok(Input::Value(&req.the_key))
    }

    fn broken(_req: &Mock) -> Result<Input<'_>, Error> {
        Err(Error::extract("body", "socket hung up"))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Bar {
        #[serde(rename = "bar")]
        Bar,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        foo: Bar,
    }

    const ALL: [Field; 4] = [Field::Body, Field::Query, Field::Headers, Field::Cookies];

    #[test]
    fn any_field_continues_under_its_own_name() {
        for field in ALL {
            let step = FieldParser::new(get_the_key, field).with_default(typed::<Foo>());
            let req = Mock { the_key: json!({ "foo": "bar" }) };

            let parsed = step.call(&req).unwrap().continued().unwrap();
            assert_eq!(parsed.key(), field.as_str());
            assert_eq!(parsed.value(), &Foo { foo: Bar::Bar });
        }
    }

    #[test]
    fn any_field_stops_with_bad_request() {
        for field in ALL {
            let step = FieldParser::new(get_the_key, field).with_default(typed::<Foo>());
            let req = Mock { the_key: json!({ "foo": "BAR" }) };

            let res = step.call(&req).unwrap().stopped().unwrap();
            assert_eq!(res.status_code(), http::StatusCode::BAD_REQUEST);
            let body: Value = serde_json::from_slice(res.body()).unwrap();
            assert_eq!(body["_errors"], json!([]));
            assert_eq!(body["foo"]["_errors"].as_array().unwrap().len(), 1);
        }
    }

    #[test]
    fn custom_handler_output_is_the_stop_payload() {
        let step = body(get_the_key).with_handler(typed::<Foo>(), |_err: ValidationError| "test-error-text");
        let req = Mock { the_key: json!({ "foo": "BAR" }) };
        assert_eq!(step.call(&req).unwrap(), Outcome::Stop("test-error-text"));

        let ok = Mock { the_key: json!({ "foo": "bar" }) };
        assert!(step.call(&ok).unwrap().is_continue());
    }

    #[test]
    fn envelope_names_the_field() {
        let step = query(get_the_key).with_handler(typed::<Foo>(), BadRequestEnvelope);
        let req = Mock { the_key: json!({}) };

        let res = step.call(&req).unwrap().stopped().unwrap();
        assert_eq!(res.status_code(), http::StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["type"], "query");
        assert_eq!(body["error"]["issues"][0]["message"], "missing field `foo`");
    }

    #[test]
    fn extraction_failure_is_not_a_validation_failure() {
        let step = cookies(broken).with_default(typed::<Foo>());
        let req = Mock { the_key: Value::Null };
        assert!(matches!(step.call(&req), Err(Error::Extract { field: "body", .. })));
    }

    #[test]
    fn same_request_same_outcome() {
        let step = headers(get_the_key).with_default(typed::<Foo>());
        for payload in [json!({ "foo": "bar" }), json!({ "foo": 1 })] {
            let req = Mock { the_key: payload };
            assert_eq!(step.call(&req).unwrap(), step.call(&req).unwrap());
        }
    }

    #[test]
    fn parsed_serializes_as_one_entry() {
        let parsed = Parsed::new(Field::Cookies, json!({ "session": "abc" }));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!({ "cookies": { "session": "abc" } }));
        assert_eq!(parsed.into_parts().0, Field::Cookies);
    }
}
