//! esdb-http: asynchronous HTTP transport for the esdb client
//!
//! Issues GET/POST/PUT/DELETE requests with optional Basic authentication and
//! reports each outcome through exactly one of two callbacks, without ever
//! blocking the caller.
//!
//! # Architecture
//!
//! - `HttpAsyncClient`: validates, builds and dispatches requests
//! - `auth`: Basic `Authorization` header construction
//! - `codec`: UTF-8 (no BOM) body encoding and full-drain decoding
//! - `HttpTransport`: the underlying HTTP stack, reqwest by default
//!
//! Status codes are never interpreted here; a 404 or 500 is a successful
//! exchange as far as this crate is concerned.

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::{basic_auth_header, UserCredentials};
pub use client::HttpAsyncClient;
pub use config::HttpClientConfig;
pub use error::{HttpError, HttpErrorCategory, HttpResult};
pub use request::{HttpMethod, OutboundRequest};
pub use response::{HttpResponse, HttpResponseBuilder};
pub use transport::{HttpTransport, ReqwestTransport, WireRequest, WireResponse};

// Re-export shared HTTP types from esdb-common
pub use esdb_common::http::HttpStatus;
