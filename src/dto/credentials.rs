use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::CredentialEntity,
    dto::{
        format_system_time,
        validation::{validate_not_blank, validate_rfc3339},
    },
};

/// Provider tokens obtained by the client after its OAuth code exchange.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertCredentialsRequest {
    pub access_token: String,
    pub refresh_token: String,
    /// RFC 3339 expiry of `access_token`.
    pub expires_at: String,
    #[serde(default)]
    pub scope: Option<String>,
}

impl Validate for UpsertCredentialsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.access_token) {
            errors.add("access_token", e);
        }
        if let Err(e) = validate_not_blank(&self.refresh_token) {
            errors.add("refresh_token", e);
        }
        if let Err(e) = validate_rfc3339(&self.expires_at) {
            errors.add("expires_at", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Connection state of the caller's provider account. Tokens are never echoed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl CredentialStatus {
    /// Status of a user without stored credentials.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            expires_at: None,
            scope: None,
        }
    }
}

impl From<&CredentialEntity> for CredentialStatus {
    fn from(record: &CredentialEntity) -> Self {
        Self {
            connected: true,
            expires_at: Some(format_system_time(record.expires_at)),
            scope: record.scope.clone(),
        }
    }
}
