use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{CredentialEntity, SessionEntity};

pub const SESSION_PREFIX: &str = "session::";
pub const CREDENTIALS_PREFIX: &str = "credentials::";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub session: SessionEntity,
}

impl From<(SessionEntity, Option<String>)> for CouchSessionDocument {
    fn from((session, rev): (SessionEntity, Option<String>)) -> Self {
        Self {
            id: session_doc_id(session.id),
            rev,
            session,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchCredentialDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialEntity,
}

impl From<(CredentialEntity, Option<String>)> for CouchCredentialDocument {
    fn from((credentials, rev): (CredentialEntity, Option<String>)) -> Self {
        Self {
            id: credentials_doc_id(&credentials.user_id),
            rev,
            credentials,
        }
    }
}

/// Revision-only view used before deletes.
#[derive(Debug, Deserialize)]
pub struct CouchRevision {
    #[serde(rename = "_rev")]
    pub rev: String,
}

pub fn session_doc_id(id: Uuid) -> String {
    format!("{SESSION_PREFIX}{id}")
}

/// User ids are opaque, so they are hex-encoded to stay URL and key safe.
pub fn credentials_doc_id(user_id: &str) -> String {
    let encoded: String = user_id.bytes().map(|byte| format!("{byte:02x}")).collect();
    format!("{CREDENTIALS_PREFIX}{encoded}")
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use serde_json::json;

    use super::*;

    #[test]
    fn credential_ids_are_hex_encoded() {
        assert_eq!(credentials_doc_id("ab/c"), "credentials::61622f63");
        assert_eq!(credentials_doc_id(""), "credentials::");
    }

    #[test]
    fn documents_carry_couch_metadata() {
        let credentials = CredentialEntity {
            user_id: "u1".into(),
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: SystemTime::UNIX_EPOCH,
            scope: Some("streaming".into()),
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let doc = CouchCredentialDocument::from((credentials.clone(), Some("1-abc".into())));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], json!("credentials::7531"));
        assert_eq!(value["_rev"], json!("1-abc"));
        assert_eq!(value["access_token"], json!("a"));

        let back: CouchCredentialDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back.credentials, credentials);
    }

    #[test]
    fn new_documents_omit_revision() {
        let credentials = CredentialEntity {
            user_id: "u1".into(),
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: SystemTime::UNIX_EPOCH,
            scope: None,
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let value = serde_json::to_value(CouchCredentialDocument::from((credentials, None))).unwrap();
        assert!(value.get("_rev").is_none());
    }
}
