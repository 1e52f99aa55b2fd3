/*
 * Responsibility
 * - Registration and OTP login DTOs
 */
use serde::{Deserialize, Serialize};

use crate::repos::user_repo::UserDoc;
use crate::services::auth::{Role, otp};
use crate::services::record_id::RecordId;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email is required");
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err("email must be <= 254 chars");
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("email is not valid"),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<Role, &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err("name must be <= 100 chars");
        }
        validate_email(&self.email)?;
        Role::parse(self.role.trim()).ok_or("role must be 'educator' or 'learner'")
    }
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

impl OtpRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_email(&self.email)
    }
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

impl OtpVerifyRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_email(&self.email)?;
        if !otp::is_well_formed(self.code.trim()) {
            return Err("code must be 6 digits");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

impl From<UserDoc> for UserResponse {
    fn from(user: UserDoc) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub role: Role,
    pub expires_in: u64,
}
