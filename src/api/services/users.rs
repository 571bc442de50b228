use anyhow::Result;

use crate::protocol::{
    types::{ChangePasswordRequest, UpdateProfileRequest, User},
    ApiClient, ApiError,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub struct UserService<'a> {
    client: &'a ApiClient,
}

impl<'a> UserService<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.client.get("/me").await
    }

    /// Update name and/or avatar. The stored session user follows the change.
    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<User> {
        let user: User = self.client.put_json("/me", request).await?;
        if let Err(err) = self.client.session().set_user(user.clone()) {
            log::warn!("Profile updated but session copy not saved: {err:#}");
        }
        Ok(user)
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), ApiError> {
        if new != confirm {
            return Err(ApiError::validation("Passwords do not match"));
        }
        validate_new_password(new)?;

        let request = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        };
        self.client.put_json_unit("/me/password", &request).await
    }
}

pub(crate) fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_rule() {
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("exactly8").is_ok());
        assert_eq!(
            validate_new_password("1234567").unwrap_err().to_string(),
            "Password must be at least 8 characters"
        );
    }
}
