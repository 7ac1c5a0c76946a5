//! REST backend speaking the hosted platform's auth, table and storage
//! APIs. One instance implements every service trait; construction only
//! succeeds when the backend section of the config is filled in.

use crate::config::BackendConfig;
use crate::errors::ServiceError;
use crate::services::identity::{IdentityProvider, SessionCallback};
use crate::services::storage::ObjectStorage;
use crate::services::tables::{CatalogStore, NewSimulationRecord, ProfileStore, SimulationStore};
use crate::types::{
    Procedure, ProfileUpdate, SavedSimulation, SessionInfo, ShadeSwatch, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<SessionInfo>>,
    listeners: RwLock<Vec<SessionCallback>>,
    signed_url_ttl: u64,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Arc<Self>, ServiceError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| ServiceError::NotConfigured("backend base URL is not set".to_string()))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| ServiceError::NotConfigured("backend anon key is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Arc::new(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            session: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
            signed_url_ttl: config.signed_url_ttl_secs,
        }))
    }

    /// Token sent as the bearer credential: the user's access token when
    /// signed in, the anon key otherwise
    fn bearer(&self) -> String {
        self.session
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn set_session(&self, session: Option<SessionInfo>) {
        *self.session.write().expect("lock poisoned") = session.clone();
        for listener in self.listeners.read().expect("lock poisoned").iter() {
            listener(session.clone());
        }
    }

    async fn expect_success(
        response: reqwest::Response,
        on_error: fn(String) -> ServiceError,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        let message = format!("status {}: {}", status.as_u16(), detail.trim());
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ServiceError::Auth(message));
        }
        Err(on_error(message))
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<Vec<T>, ServiceError> {
        let url = format!("{}/rest/v1/{}", self.base_url, path_and_query);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Query).await?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn resolve_object_url(&self, bucket: &str, path: &str) -> Result<String, ServiceError> {
        let public_url = format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        );
        match self.client.head(&public_url).send().await {
            Ok(response) if response.status().is_success() => return Ok(public_url),
            Ok(response) => log::debug!(
                "Public URL for {}/{} returned {}, requesting a signed URL",
                bucket,
                path,
                response.status()
            ),
            Err(e) => log::debug!("Public URL probe for {}/{} failed: {}", bucket, path, e),
        }
        self.signed_object_url(bucket, path).await
    }

    async fn signed_object_url(&self, bucket: &str, path: &str) -> Result<String, ServiceError> {
        let url = format!("{}/storage/v1/object/sign/{}/{}", self.base_url, bucket, path);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .json(&serde_json::json!({ "expiresIn": self.signed_url_ttl }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Storage).await?;
        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        if signed.signed_url.starts_with("http") {
            Ok(signed.signed_url)
        } else {
            Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
        }
    }
}

#[async_trait]
impl IdentityProvider for RestBackend {
    async fn current_session(&self) -> Result<Option<SessionInfo>, ServiceError> {
        Ok(self.session.read().expect("lock poisoned").clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionInfo, ServiceError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Auth).await?;
        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        let session = auth
            .into_session()
            .ok_or_else(|| ServiceError::Auth("sign-in response carried no session".to_string()))?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        phone: &str,
    ) -> Result<Option<SessionInfo>, ServiceError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": {
                    "nome_completo": display_name,
                    "telefone": phone,
                },
            }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Auth).await?;
        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        // Backends requiring email confirmation answer without a token
        let session = auth.into_session();
        if let Some(session) = &session {
            self.set_session(Some(session.clone()));
        }
        Ok(session)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        let url = format!("{}/auth/v1/recover", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Self::expect_success(response, ServiceError::Auth).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let token = self.bearer();
        // The local session is gone regardless of what the server says
        self.set_session(None);

        let url = format!("{}/auth/v1/logout", self.base_url);
        let result = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => log::warn!(
                "Token revocation returned status {}",
                response.status().as_u16()
            ),
            Err(e) => log::warn!("Token revocation failed: {}", e),
        }
        Ok(())
    }

    fn subscribe(&self, callback: SessionCallback) {
        self.listeners.write().expect("lock poisoned").push(callback);
    }
}

#[async_trait]
impl ProfileStore for RestBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ServiceError> {
        let rows: Vec<ProfileRow> = self
            .get_rows(&format!("usuarios?id=eq.{}&select=*", user_id))
            .await?;
        Ok(rows.into_iter().next().map(UserProfile::from))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<UserProfile, ServiceError> {
        let mut body = serde_json::Map::new();
        if let Some(v) = &changes.display_name {
            body.insert("nome_completo".to_string(), v.clone().into());
        }
        if let Some(v) = &changes.phone {
            body.insert("telefone".to_string(), v.clone().into());
        }
        if let Some(v) = &changes.company {
            body.insert("empresa".to_string(), v.clone().into());
        }
        if let Some(v) = &changes.tax_id {
            body.insert("cpf_cnpj".to_string(), v.clone().into());
        }
        if let Some(v) = &changes.logo_url {
            body.insert("logo_url".to_string(), v.clone().into());
        }
        body.insert("atualizado_em".to_string(), Utc::now().to_rfc3339().into());

        let url = format!("{}/rest/v1/usuarios?id=eq.{}", self.base_url, user_id);
        let response = self
            .client
            .patch(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header("Prefer", "return=representation")
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Query).await?;
        let rows: Vec<ProfileRow> = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(UserProfile::from)
            .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))
    }
}

#[async_trait]
impl CatalogStore for RestBackend {
    async fn fetch_procedures(&self) -> Result<Vec<Procedure>, ServiceError> {
        let rows: Vec<ProcedureRow> = self
            .get_rows("procedimentos?ativo=eq.true&order=nome.asc&select=*")
            .await?;
        Ok(rows.into_iter().map(Procedure::from).collect())
    }

    async fn fetch_shades(&self) -> Result<Vec<ShadeSwatch>, ServiceError> {
        let rows: Vec<ShadeRow> = self
            .get_rows("cores_vita?ativo=eq.true&order=nome.asc&select=*")
            .await?;
        Ok(rows.into_iter().map(ShadeSwatch::from).collect())
    }
}

#[async_trait]
impl SimulationStore for RestBackend {
    async fn insert(&self, record: &NewSimulationRecord) -> Result<SavedSimulation, ServiceError> {
        let url = format!("{}/rest/v1/simulacoes", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "usuario_id": record.user_id,
                "procedimento_id": record.procedure_id,
                "nome_paciente": record.patient_name,
                "imagem_original_url": record.original_image_url,
                "imagem_simulada_url": record.simulated_image_url,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let response = Self::expect_success(response, ServiceError::Query).await?;
        let rows: Vec<SimulationRow> = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(SavedSimulation::from)
            .ok_or_else(|| ServiceError::Query("insert returned no row".to_string()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedSimulation>, ServiceError> {
        let rows: Vec<SimulationRow> = self
            .get_rows(&format!(
                "simulacoes?usuario_id=eq.{}&order=criado_em.desc&select=*,procedimentos(nome)",
                user_id
            ))
            .await?;
        Ok(rows.into_iter().map(SavedSimulation::from).collect())
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<(), ServiceError> {
        let url = format!(
            "{}/rest/v1/simulacoes?id=eq.{}&usuario_id=eq.{}",
            self.base_url, id, user_id
        );
        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Self::expect_success(response, ServiceError::Query).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Self::expect_success(response, ServiceError::Storage).await?;

        self.resolve_object_url(bucket, path).await
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), ServiceError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Self::expect_success(response, ServiceError::Storage).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl AuthResponse {
    fn into_session(self) -> Option<SessionInfo> {
        let token = self.access_token?;
        let user = self.user?;
        let mut session = SessionInfo::new(user.id, token);
        if let Some(email) = user.email {
            session = session.with_email(email);
        }
        Some(session)
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    nome_completo: String,
    telefone: Option<String>,
    empresa: Option<String>,
    cpf_cnpj: Option<String>,
    logo_url: Option<String>,
    ativo: bool,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            display_name: row.nome_completo,
            phone: row.telefone,
            company: row.empresa,
            tax_id: row.cpf_cnpj,
            logo_url: row.logo_url,
            active: row.ativo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcedureRow {
    id: String,
    nome: String,
    webhook_valor: String,
    ativo: bool,
}

impl From<ProcedureRow> for Procedure {
    fn from(row: ProcedureRow) -> Self {
        Self {
            id: row.id,
            display_name: row.nome,
            webhook_value: row.webhook_valor,
            active: row.ativo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShadeRow {
    id: String,
    nome: String,
    hexadecimal: String,
    ativo: bool,
}

impl From<ShadeRow> for ShadeSwatch {
    fn from(row: ShadeRow) -> Self {
        Self {
            id: row.id,
            display_name: row.nome,
            color_hex: row.hexadecimal,
            active: row.ativo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SimulationRow {
    id: String,
    usuario_id: String,
    procedimento_id: Option<String>,
    nome_paciente: String,
    imagem_original_url: String,
    imagem_simulada_url: String,
    criado_em: DateTime<Utc>,
    procedimentos: Option<ProcedureNameRow>,
}

#[derive(Debug, Deserialize)]
struct ProcedureNameRow {
    nome: String,
}

impl From<SimulationRow> for SavedSimulation {
    fn from(row: SimulationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.usuario_id,
            procedure_id: row.procedimento_id,
            patient_name: row.nome_paciente,
            original_image_url: row.imagem_original_url,
            simulated_image_url: row.imagem_simulada_url,
            created_at: row.criado_em,
            procedure_name: row.procedimentos.map(|p| p.nome),
        }
    }
}
