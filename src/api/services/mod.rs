//! Typed wrappers over the backend REST resources.
//!
//! Each service borrows the shared [`ApiClient`] so they all see the same
//! session and refresh gate:
//!
//! ```rust,no_run
//! # async fn demo(client: &nutriscan::protocol::ApiClient) -> anyhow::Result<()> {
//! let history = client.scans().list(1, 10).await?;
//! for scan in history.scans {
//!     println!("{} {}", scan.id, scan.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod auth;
pub mod compare;
pub mod corrections;
pub mod products;
pub mod scans;
pub mod users;

pub use admin::AdminService;
pub use auth::AuthService;
pub use compare::{comparable, CompareSelection, CompareService};
pub use corrections::CorrectionService;
pub use products::ProductService;
pub use scans::ScanService;
pub use users::{UserService, MIN_PASSWORD_LEN};

use serde::Serialize;

use crate::protocol::ApiClient;

/// `page`/`limit` query pair shared by the paginated listings
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }
}

impl ApiClient {
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self)
    }

    pub fn scans(&self) -> ScanService<'_> {
        ScanService::new(self)
    }

    pub fn corrections(&self) -> CorrectionService<'_> {
        CorrectionService::new(self)
    }

    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self)
    }

    pub fn compare(&self) -> CompareService<'_> {
        CompareService::new(self)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(self)
    }

    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(self)
    }
}
