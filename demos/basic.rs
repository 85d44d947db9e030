//! Minimal tsu-fields example: one endpoint with a header and a body step.
//!
//! Run with:
//!   cargo run --example basic
//!
//! No socket is opened. Requests are built in-process and fed straight to
//! the endpoint, the way a server adapter would after reading them.

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;
use tsu_fields::{Context, Endpoint, Field, Pipeline, Request, Response, body, headers, schema};

#[derive(Deserialize)]
struct CreateUser {
    name: String,
    tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Client {
    x_request_id: String,
}

#[tokio::main]
async fn main() -> Result<(), tsu_fields::Error> {
    tracing_subscriber::fmt::init();

    let endpoint = Pipeline::new()
        .with(headers(schema::typed::<Client>()))
        .with(body(schema::typed::<CreateUser>()))
        .then(create_user);

    send(&endpoint, r#"{"name":"alice","tags":["admin"]}"#).await?;
    send(&endpoint, r#"{"name":"alice","tags":[7]}"#).await?;
    Ok(())
}

// POST /users
//
// Only reached when both steps continued; the context holds typed values.
async fn create_user(_req: Request, ctx: Context) -> Response {
    let (Some(user), Some(client)) = (
        ctx.get::<CreateUser>(Field::Body),
        ctx.get::<Client>(Field::Headers),
    ) else {
        return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
    };

    Response::builder()
        .status(StatusCode::CREATED)
        .header("x-request-id", &client.x_request_id)
        .text(format!("created {} ({} tags)", user.name, user.tags.len()))
}

async fn send(endpoint: &Endpoint, payload: &'static str) -> Result<(), tsu_fields::Error> {
    let req = http::Request::post("/users")
        .header("content-type", "application/json")
        .header("x-request-id", "demo-1")
        .body(Bytes::from_static(payload.as_bytes()))
        .map_err(|e| tsu_fields::Error::extract("body", e.to_string()))?;

    let res = endpoint.call(Request::from_http(req)?).await?;
    println!("{} {}", res.status_code(), String::from_utf8_lossy(res.body()));
    Ok(())
}
