use std::sync::Arc;

use shared::{
    domain::Role,
    protocol::{ForgotPasswordRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest, User},
};
use tracing::info;

use crate::{
    error::{ClientError, ValidationError},
    transport::ApiTransport,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const NATIONAL_ID_LEN: usize = 11;
pub const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<ApiTransport>,
}

impl AuthApi {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        let request = validate_registration(registration)?;
        self.transport
            .post("/auth/register")
            .anonymous()
            .json(&request)
            .send_unit()
            .await?;
        info!("auth: registered new citizen account");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        self.transport
            .post("/auth/forgot-password")
            .anonymous()
            .json(&ForgotPasswordRequest {
                email: email.to_string(),
            })
            .send_unit()
            .await?;
        info!("auth: password reset requested");
        Ok(())
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ClientError> {
        let request = validate_reset(reset)?;
        self.transport
            .post("/auth/reset-password")
            .anonymous()
            .json(&request)
            .send_unit()
            .await?;
        info!("auth: password reset completed");
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let update = validate_profile_update(update)?;
        let user: User = self
            .transport
            .put("/users/me")
            .json(&update)
            .send_json()
            .await?;
        self.transport.session().set_user(Some(user.clone())).await?;
        info!(
            user_id = user.id.0,
            profile_completed = user.profile_completed,
            "auth: profile updated"
        );
        Ok(user)
    }
}

fn validate_profile_update(update: &ProfileUpdate) -> Result<ProfileUpdate, ValidationError> {
    let trimmed = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let update = ProfileUpdate {
        full_name: trimmed(&update.full_name),
        national_id: trimmed(&update.national_id),
        birth_date: update.birth_date,
        phone_number: trimmed(&update.phone_number),
    };
    if update.is_empty() {
        return Err(ValidationError::EmptyProfileUpdate);
    }
    if let Some(national_id) = &update.national_id {
        if national_id.len() != NATIONAL_ID_LEN || !national_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidNationalId);
        }
    }
    if let Some(phone) = &update.phone_number {
        if phone.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
            return Err(ValidationError::InvalidPhoneNumber {
                min: MIN_PHONE_DIGITS,
            });
        }
    }
    Ok(update)
}

fn validate_registration(registration: &Registration) -> Result<RegisterRequest, ValidationError> {
    let name = registration.name.trim();
    let email = registration.email.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if email.is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if registration.password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    Ok(RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: registration.password.clone(),
        role: Role::Citizen,
    })
}

fn validate_reset(reset: &PasswordReset) -> Result<ResetPasswordRequest, ValidationError> {
    let token = reset.token.trim();
    if token.is_empty() {
        return Err(ValidationError::MissingField("reset token"));
    }
    if reset.new_password.is_empty() || reset.confirm_password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    if reset.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if reset.new_password != reset.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(ResetPasswordRequest {
        token: token.to_string(),
        new_password: reset.new_password.clone(),
    })
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
