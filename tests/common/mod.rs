//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, TEST_EMAIL};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_profile() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::authenticated(&server, TEST_EMAIL);
//!
//!     let response = client.get_profile().await;
//!     assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! }
//! ```

mod client;
mod constants;
mod fakes;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fakes::{ComposeScript, FakeUpstreams};
pub use server::TestServer;
