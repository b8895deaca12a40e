use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

/// IdentityProvider
///
/// Creates login accounts in the external auth service. The portal only stores the
/// profile row keyed by the id the provider hands back.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<Uuid, String>;
}

/// Minimal view of Supabase's admin user response: only the id matters here.
#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
}

/// SupabaseIdentityProvider
///
/// Calls the GoTrue admin endpoint with the service key, confirming the email up
/// front since accounts are provisioned by administrators.
#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseIdentityProvider {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Uuid, String> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            // Typically: email already registered or password policy violation.
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("identity provider returned {status}: {body}"));
        }

        response
            .json::<SupabaseUser>()
            .await
            .map(|user| user.id)
            .map_err(|e| e.to_string())
    }
}

/// MockIdentityProvider
///
/// Hands out fresh UUIDs without any network access and remembers the emails it
/// provisioned.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    pub should_fail: bool,
    accounts: Arc<Mutex<Vec<String>>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Emails of every account created so far.
    pub fn accounts(&self) -> Vec<String> {
        self.accounts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_account(&self, email: &str, _password: &str) -> Result<Uuid, String> {
        if self.should_fail {
            return Err("Mock Identity Error: Simulation requested".to_string());
        }
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.push(email.to_string());
        }
        Ok(Uuid::new_v4())
    }
}

pub type IdentityState = Arc<dyn IdentityProvider>;
