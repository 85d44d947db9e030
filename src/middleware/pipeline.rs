//! Sequential pipeline runner.
//!
//! Steps of different types are stored behind one trait object, the same way
//! handlers are (see [`handler`](crate::handler)): a private `ErasedStep`
//! trait, a newtype that implements it for any typed [`Middleware`], and an
//! `Arc<dyn …>` so a pipeline is cheap to clone and share across requests.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Context, Merge, Middleware, Outcome};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

trait ErasedStep: Send + Sync {
    fn run(&self, req: &Request, ctx: &mut Context) -> Result<Option<Response>, Error>;
}

struct Step<M>(M);

impl<M> ErasedStep for Step<M>
where
    M: Middleware<Request>,
    M::Output: Merge,
    M::Response: IntoResponse,
{
    fn run(&self, req: &Request, ctx: &mut Context) -> Result<Option<Response>, Error> {
        match self.0.call(req)? {
            Outcome::Continue(data) => {
                data.merge_into(ctx);
                Ok(None)
            }
            Outcome::Stop(response) => Ok(Some(response.into_response())),
        }
    }
}

/// An ordered list of middleware steps.
///
/// ```rust
/// use serde::Deserialize;
/// use tsu_fields::{Pipeline, Request, body, headers, schema};
///
/// #[derive(Deserialize)]
/// struct Login { user: String, password: String }
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "kebab-case")]
/// struct Client { user_agent: String }
///
/// let pipeline = Pipeline::new()
///     .with(headers(schema::typed::<Client>()))
///     .with(body(schema::typed::<Login>()));
///
/// let req = http::Request::post("/login")
///     .header("content-type", "application/json")
///     .header("user-agent", "curl/8")
///     .body(bytes::Bytes::from_static(br#"{"user":"alice","password":"hunter2"}"#))
///     .unwrap();
/// let req = Request::from_http(req).unwrap();
///
/// let ctx = pipeline.run(&req).unwrap().continued().unwrap();
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn ErasedStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step. Returns `self` for chaining.
    pub fn with<M>(mut self, step: M) -> Self
    where
        M: Middleware<Request> + 'static,
        M::Output: Merge,
        M::Response: IntoResponse,
    {
        self.steps.push(Arc::new(Step(step)));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order against `req`.
    ///
    /// Returns the merged context if all steps continued, or the first stop
    /// response. Steps after a stop never run.
    pub fn run(&self, req: &Request) -> Result<Outcome<Context>, Error> {
        let mut ctx = Context::new();
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(response) = step.run(req, &mut ctx)? {
                debug!(
                    method = %req.method(),
                    path = req.path(),
                    step = index,
                    status = response.status_code().as_u16(),
                    "pipeline stopped"
                );
                return Ok(Outcome::Stop(response));
            }
        }
        Ok(Outcome::Continue(ctx))
    }

    /// Terminates the pipeline with a handler.
    pub fn then(self, handler: impl Handler) -> Endpoint {
        Endpoint { pipeline: self, handler: handler.into_boxed_handler() }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.steps.len()).finish()
    }
}

/// A pipeline nests inside another one; its context merges into the outer.
impl Middleware<Request> for Pipeline {
    type Output = Context;
    type Response = Response;

    fn call(&self, req: &Request) -> Result<Outcome<Context>, Error> {
        self.run(req)
    }
}

/// A pipeline followed by the handler that receives its context.
#[derive(Clone)]
pub struct Endpoint {
    pipeline: Pipeline,
    handler: BoxedHandler,
}

impl Endpoint {
    /// Runs the pipeline; on continue, runs the handler with the context.
    pub async fn call(&self, req: Request) -> Result<Response, Error> {
        let outcome = self.pipeline.run(&req)?;
        match outcome {
            Outcome::Continue(ctx) => Ok(self.handler.call(req, ctx).await),
            Outcome::Stop(response) => Ok(response),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("pipeline", &self.pipeline).finish_non_exhaustive()
    }
}
