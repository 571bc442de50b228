use super::PageQuery;
use crate::protocol::{
    http::segment,
    types::{AdminStats, AdminUser, PaginatedUsers, Role, UpdateUserRoleRequest},
    ApiClient, ApiError,
};

/// Administrative endpoints. The backend rejects non-admin sessions with 403.
pub struct AdminService<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn stats(&self) -> Result<AdminStats, ApiError> {
        self.client.get("/admin/stats").await
    }

    pub async fn users(&self, page: u32, limit: u32) -> Result<PaginatedUsers, ApiError> {
        self.client
            .get_query("/admin/users", &PageQuery::new(page, limit))
            .await
    }

    pub async fn user(&self, user_id: &str) -> Result<AdminUser, ApiError> {
        self.client
            .get(&format!("/admin/users/{}", segment(user_id)))
            .await
    }

    pub async fn update_role(&self, user_id: &str, role: Role) -> Result<AdminUser, ApiError> {
        self.client
            .put_json(
                &format!("/admin/users/{}/role", segment(user_id)),
                &UpdateUserRoleRequest { role },
            )
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/admin/users/{}", segment(user_id)))
            .await
    }
}
