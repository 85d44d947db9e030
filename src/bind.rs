//! Parse steps bound to this crate's [`Request`].
//!
//! | function | reads | default rejection |
//! |---|---|---|
//! | [`body`] / [`body_with`] | [`Request::body`] | [`BadRequest`] |
//! | [`query`] / [`query_with`] | [`Request::query`] | [`BadRequest`] |
//! | [`headers`] / [`headers_with`] | [`Request::headers`] via [`HeaderAccessor`] | [`BadRequest`] |
//! | [`cookies`] / [`cookies_with`] | [`Request::cookies`] | [`BadRequest`] |
//!
//! Headers are the odd one out: the schema reads them one name at a time
//! through a [`HeaderAccessor`], so only the names a schema asks for are ever
//! seen. See [`headers`](crate::headers) for what that means for open maps.

use crate::error::Error;
use crate::headers::HeaderAccessor;
use crate::parser::{self, BadRequest, ErrorHandler, FieldParser, ParseStep};
use crate::request::Request;
use crate::schema::{Input, Schema};

/// The extractor type every binding below uses.
pub type Extractor = for<'r> fn(&'r Request) -> Result<Input<'r>, Error>;

fn get_body(req: &Request) -> Result<Input<'_>, Error> {
    Ok(Input::Value(req.body()))
}

fn get_query(req: &Request) -> Result<Input<'_>, Error> {
    Ok(Input::Value(req.query()))
}

fn get_headers(req: &Request) -> Result<Input<'_>, Error> {
    Ok(Input::Headers(HeaderAccessor::new(req.headers())))
}

fn get_cookies(req: &Request) -> Result<Input<'_>, Error> {
    Ok(Input::Value(req.cookies()))
}

pub const BODY: FieldParser<Extractor> = parser::body(get_body as Extractor);
pub const QUERY: FieldParser<Extractor> = parser::query(get_query as Extractor);
pub const HEADERS: FieldParser<Extractor> = parser::headers(get_headers as Extractor);
pub const COOKIES: FieldParser<Extractor> = parser::cookies(get_cookies as Extractor);

pub fn body<S: Schema>(schema: S) -> ParseStep<Extractor, S, BadRequest> {
    BODY.with_default(schema)
}

pub fn body_with<S: Schema, H: ErrorHandler>(schema: S, handler: H) -> ParseStep<Extractor, S, H> {
    BODY.with_handler(schema, handler)
}

pub fn query<S: Schema>(schema: S) -> ParseStep<Extractor, S, BadRequest> {
    QUERY.with_default(schema)
}

pub fn query_with<S: Schema, H: ErrorHandler>(schema: S, handler: H) -> ParseStep<Extractor, S, H> {
    QUERY.with_handler(schema, handler)
}

pub fn headers<S: Schema>(schema: S) -> ParseStep<Extractor, S, BadRequest> {
    HEADERS.with_default(schema)
}

pub fn headers_with<S: Schema, H: ErrorHandler>(schema: S, handler: H) -> ParseStep<Extractor, S, H> {
    HEADERS.with_handler(schema, handler)
}

pub fn cookies<S: Schema>(schema: S) -> ParseStep<Extractor, S, BadRequest> {
    COOKIES.with_default(schema)
}

pub fn cookies_with<S: Schema, H: ErrorHandler>(schema: S, handler: H) -> ParseStep<Extractor, S, H> {
    COOKIES.with_handler(schema, handler)
}
