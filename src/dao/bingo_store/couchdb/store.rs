use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::dao::{
    bingo_store::BingoStore,
    models::{CredentialEntity, SessionEntity, SessionUpdate},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchCredentialDocument, CouchRevision, CouchSessionDocument, credentials_doc_id,
        session_doc_id,
    },
};

/// CouchDB-backed [`BingoStore`] talking to the HTTP document API.
#[derive(Clone)]
pub struct CouchBingoStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchBingoStore {
    /// Connect to CouchDB and create the database when it does not exist.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> CouchResult<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url();
        let database = self.database.to_string();

        let response = self
            .send(&url, self.authorize(self.client.get(&url)))
            .await?;
        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = self
                    .send(&url, self.authorize(self.client.put(&url)))
                    .await?;
                // 412 means another instance created it first.
                if created.status().is_success() || created.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: created.status(),
                    })
                }
            }
            status => Err(CouchDaoError::DatabaseStatus { database, status }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(doc_id, self.request(Method::GET, doc_id)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response.json::<T>().await.map(Some).map_err(|source| {
                CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }
            }),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .send(doc_id, self.request(Method::PUT, doc_id).json(document))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(revision) = self.get_document::<CouchRevision>(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .send(
                doc_id,
                self.request(Method::DELETE, doc_id)
                    .query(&[("rev", revision.rev.as_str())]),
            )
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }
}

impl BingoStore for CouchBingoStore {
    fn create_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move {
            let id = session.id;
            let doc = CouchSessionDocument::from((session, None));
            store.put_document(&doc.id, &doc).await?;
            Ok(id)
        })
    }

    fn update_session(
        &self,
        id: Uuid,
        update: SessionUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = session_doc_id(id);
            let mut doc = store
                .get_document::<CouchSessionDocument>(&doc_id)
                .await?
                .ok_or_else(|| StorageError::missing("session", id))?;
            update.apply(&mut doc.session);
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = session_doc_id(id);
            let maybe_doc = store.get_document::<CouchSessionDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.session))
        })
    }

    fn get_credentials(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
        let store = self.clone();
        let doc_id = credentials_doc_id(user_id);
        Box::pin(async move {
            let maybe_doc = store
                .get_document::<CouchCredentialDocument>(&doc_id)
                .await?;
            Ok(maybe_doc.map(|doc| doc.credentials))
        })
    }

    fn upsert_credentials(
        &self,
        credentials: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = credentials_doc_id(&credentials.user_id);
            let rev = store
                .get_document::<CouchRevision>(&doc_id)
                .await?
                .map(|existing| existing.rev);
            let doc = CouchCredentialDocument::from((credentials, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_credentials(&self, user_id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let doc_id = credentials_doc_id(user_id);
        Box::pin(async move { store.delete_document(&doc_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .send(&url, store.authorize(store.client.get(&url)))
                .await?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
