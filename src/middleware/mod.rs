//! Middleware protocol.
//!
//! A middleware step looks at a request and decides one of two things:
//!
//! - [`Outcome::Continue`] — here is some data, run the next step;
//! - [`Outcome::Stop`] — here is the response, run nothing else.
//!
//! Steps never mutate the request. Data a step continues with is merged into
//! a [`Context`] by the [`Pipeline`] and handed to the final handler.

mod context;
mod pipeline;

pub use context::{Context, Merge};
pub use pipeline::{Endpoint, Pipeline};

use crate::error::Error;
use crate::response::Response;

/// What a middleware step decided.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome<T, R = Response> {
    Continue(T),
    Stop(R),
}

impl<T, R> Outcome<T, R> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    /// The continue payload, if any.
    pub fn continued(self) -> Option<T> {
        match self {
            Self::Continue(value) => Some(value),
            Self::Stop(_) => None,
        }
    }

    /// The stop response, if any.
    pub fn stopped(self) -> Option<R> {
        match self {
            Self::Continue(_) => None,
            Self::Stop(response) => Some(response),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, R> {
        match self {
            Self::Continue(value) => Outcome::Continue(f(value)),
            Self::Stop(response) => Outcome::Stop(response),
        }
    }

    pub fn map_stop<Q>(self, f: impl FnOnce(R) -> Q) -> Outcome<T, Q> {
        match self {
            Self::Continue(value) => Outcome::Continue(value),
            Self::Stop(response) => Outcome::Stop(f(response)),
        }
    }
}

/// One step of a request pipeline over requests of type `Req`.
///
/// `Err` is reserved for failures the step cannot turn into a response;
/// anything a client caused belongs in [`Outcome::Stop`].
pub trait Middleware<Req>: Send + Sync {
    type Output;
    type Response;

    fn call(&self, req: &Req) -> Result<Outcome<Self::Output, Self::Response>, Error>;
}
