//! Common utilities for the esdb client
//!
//! This crate provides the pieces shared by every esdb client module that do
//! not depend on a particular transport.

pub mod connection_string;
pub mod error;
pub mod http;

pub use connection_string::{parse_connection_string, ConnectionStringTokenizer};
pub use error::{ClientError, Result};
pub use http::{HttpMethod, HttpStatus};
