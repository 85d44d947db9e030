//! # tsu-fields
//!
//! Parse a request field or reject the request. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! A handler should only ever see input that already has the right shape.
//! tsu-fields puts one middleware step in front of it per request field:
//!
//! - **body**, **query**, **headers**, **cookies** — extract the field;
//! - validate it against a schema, which is any serde `Deserialize` type;
//! - continue with the typed value attached under the field's name, or stop
//!   with `400 Bad Request` and a structured error body.
//!
//! What tsu-fields intentionally ignores: routing, the socket, sessions, and
//! schema design. Your router and your serde derives already own those.
//!
//! ## Quick start
//!
//! ```rust
//! use http::StatusCode;
//! use serde::Deserialize;
//! use tsu_fields::{Context, Field, Pipeline, Request, Response, body, schema};
//!
//! #[derive(Deserialize)]
//! struct CreateUser { name: String }
//!
//! async fn create_user(_req: Request, ctx: Context) -> Response {
//!     let user = ctx.get::<CreateUser>(Field::Body).unwrap();
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .text(format!("hello {}", user.name))
//! }
//!
//! # async fn run() -> Result<(), tsu_fields::Error> {
//! let endpoint = Pipeline::new()
//!     .with(body(schema::typed::<CreateUser>()))
//!     .then(create_user);
//!
//! let req = http::Request::post("/users")
//!     .header("content-type", "application/json")
//!     .body(bytes::Bytes::from_static(br#"{"name":7}"#))
//!     .unwrap();
//!
//! let res = endpoint.call(Request::from_http(req)?).await?;
//! assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! - [`parser`] — the framework-independent factory: give it an extractor
//!   for *your* request type and a [`Field`], get parse steps back.
//! - [`bind`] — that factory applied to this crate's [`Request`].
//! - [`middleware`] — the [`Outcome`] protocol and the [`Pipeline`] runner.

mod error;
mod handler;
mod request;
mod response;
mod validation;

pub mod bind;
pub mod headers;
pub mod middleware;
pub mod parser;
pub mod schema;

pub use bind::{body, body_with, cookies, cookies_with, headers, headers_with, query, query_with};
pub use error::Error;
pub use handler::Handler;
pub use headers::{HeaderAccessor, HeaderError};
pub use middleware::{Context, Endpoint, Merge, Middleware, Outcome, Pipeline};
pub use parser::{BadRequest, BadRequestEnvelope, ErrorHandler, Field, FieldParser, ParseStep, Parsed};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use schema::{Input, Schema, SchemaExt};
pub use validation::{ERRORS_KEY, Issue, ValidationError};
