use super::error::ProviderError;
use super::rest_provider::RestAuthProvider;
use crate::models::{Session, UserRole};
use secrecy::Secret;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

#[derive(Clone, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegistrationRequest {
    /// Copy with surrounding whitespace removed from names and email.
    pub fn normalized(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Create the account, its `employee` profile row, and sign in.
pub async fn register(
    provider: &RestAuthProvider,
    request: RegistrationRequest,
    profile_collection: &str,
) -> Result<Session, RegistrationError> {
    let request = request.normalized();
    request.validate()?;

    let password = Secret::new(request.password);
    let user_id = provider
        .sign_up(
            &request.email,
            &password,
            &request.first_name,
            &request.last_name,
        )
        .await?;

    provider
        .insert_row(
            profile_collection,
            &json!({
                "id": user_id,
                "first_name": request.first_name,
                "last_name": request.last_name,
                "email": request.email,
                "role": UserRole::Employee.as_str(),
            }),
        )
        .await?;
    info!(user_id = %user_id, "Registered new user");

    Ok(provider
        .sign_in_with_password(&request.email, &password)
        .await?)
}
