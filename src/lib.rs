//! nutriscan: client library and CLI for the nutrition-label scanning API.
//!
//! The library covers the whole client side of the product: session handling
//! with transparent token refresh, typed access to every REST resource, the
//! upload/submit/poll workflow for label scans, and barcode decoding for
//! product lookup. The `nutriscan` binary is a thin command-line front end
//! over the same modules.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod protocol;

pub use api::*;
pub use boot::init_common;
pub use core::{ClientConfig, Session, SessionStore};
pub use protocol::{ApiClient, ApiError};
