use serde::{Deserialize, Serialize};

use super::auth::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_scans: u64,
    pub total_products: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<String>,
    #[serde(default)]
    pub has_password: Option<bool>,
    #[serde(default)]
    pub has_google_linked: Option<bool>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedUsers {
    pub users: Vec<AdminUser>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserRoleRequest {
    pub role: Role,
}
