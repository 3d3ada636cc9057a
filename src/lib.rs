//! The `scratchstack_link_integrity` crate makes URLs handed to untrusted clients tamper-evident.
//!
//! A link is signed by appending a checksum query parameter: a keyed digest over the canonical
//! form of the link (scheme, host, port, path, and the query parameters sorted by name and value)
//! using a server-side secret. When the link is followed, the checksum is recomputed from the
//! request and compared. A mismatch means the client edited the link, and the request is routed
//! to a tampered-link handler instead of the one it asked for.
//!
//! This is not encryption. The parameters stay readable; only changes to them are detectable.
//!
//! # Workflow
//! 1. Build a [`ChecksumConfig`] once at startup, either with [`ChecksumConfig::builder`] or from
//!    string-keyed options with [`configure`].
//! 2. Wrap it in a [`LinkIntegrity`] context and call
//!    [`install_default_handler`][LinkIntegrity::install_default_handler] on your dispatch table,
//!    or wrap your service with [`LinkIntegrity::layer`].
//! 3. Sign the links you render with [`LinkIntegrity::sign`] or [`LinkIntegrity::sign_self_link`].
//! 4. Verify each incoming request with [`LinkIntegrity::verify_current_request`] (the layer does
//!    this for you). Servers behind TLS see origin-form requests, so give the layer
//!    [`RequestViewOptions`] with a default scheme of `https`.
//!
//! ## Example
//! ```rust
//! use http::{Request, Response, StatusCode};
//! use scratchstack_link_integrity::{configure, ConfigValue, LinkIntegrity};
//! use tower::{service_fn, BoxError, Layer, ServiceExt};
//!
//! async fn show_item(_req: Request<()>) -> Result<Response<String>, BoxError> {
//!     Ok(Response::new("Here is your item".to_string()))
//! }
//!
//! # tokio_test::block_on(async {
//! let config = configure([
//!     ("secret", ConfigValue::from("correct horse battery staple")),
//!     ("checksumParamName", "sig".into()),
//! ])
//! .unwrap();
//! let link_integrity = LinkIntegrity::new(config);
//!
//! // Render a signed link.
//! let link = link_integrity.sign("https://www.example.com/item", vec![("id", "42")]).unwrap();
//! assert!(link.starts_with("https://www.example.com/item?id=42&sig="));
//!
//! // Serve requests through the verifying layer.
//! let service = link_integrity.layer().layer(service_fn(show_item));
//!
//! let followed = Request::get(link.as_str()).body(()).unwrap();
//! let response = service.clone().oneshot(followed).await.unwrap();
//! assert_eq!(response.status(), StatusCode::OK);
//!
//! // A client changing the id is sent to the tampered-link handler instead.
//! let edited = Request::get(link.replace("id=42", "id=43").as_str()).body(()).unwrap();
//! let response = service.oneshot(edited).await.unwrap();
//! assert_eq!(response.status(), StatusCode::FORBIDDEN);
//! # });
//! ```
#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod canonical;
mod components;
mod config;
mod constants;
mod context;
mod digest;
mod dispatch;
mod engine;
mod error;
mod params;
mod request;
mod service;
mod signer;
mod verifier;

pub use crate::{
    canonical::canonicalize,
    components::{UrlComponents, UrlComponentsBuilder},
    config::{configure, ChecksumConfig, ChecksumConfigBuilder, ConfigValue},
    constants::{DEFAULT_CHECKSUM_PARAM, DEFAULT_TAMPERED_HANDLER},
    context::LinkIntegrity,
    digest::DigestAlgorithm,
    dispatch::{access_denied_handler, access_denied_response, Dispatcher, Handler, HandlerTable},
    engine::{compute_checksum, ChecksumGenerator},
    error::LinkIntegrityError,
    params::ExtraParams,
    request::{HttpRequestView, RequestView, RequestViewOptions, RequestViewOptionsBuilder, RouteParamsFn},
    service::{AccessDeniedService, LinkIntegrityLayer, LinkIntegrityService},
    signer::{sign_components, sign_link, sign_self_link, SelfLinkOptions, SelfLinkOptionsBuilder},
    verifier::{verify_components, verify_request, TamperCallback, TamperedLink, VerificationOutcome},
};
