use crate::client::{AuthAdmin, AuthUser, NewAuthUser, Profile};
use crate::error::ProvisionError;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

const USERS_PER_PAGE: usize = 200;
const PROFILE_TABLE: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_role_key: service_role_key.into(),
        }
    }
}

/// Talks to the auth admin API (`/auth/v1/admin/users`) and to the REST API
/// for the profile table, authenticated with the service-role key.
pub struct SupabaseAdminClient {
    http: reqwest::Client,
    config: SupabaseConfig,
}

#[derive(Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<UserBody>,
}

impl SupabaseAdminClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, ProvisionError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("strata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisionError::Http {
                operation: "client_build".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    fn admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.config.url)
    }

    fn profile_url(&self) -> String {
        format!("{}/rest/v1/{PROFILE_TABLE}", self.config.url)
    }
}

async fn send(operation: &str, builder: RequestBuilder) -> Result<Response, ProvisionError> {
    let response = builder.send().await.map_err(|e| ProvisionError::Http {
        operation: operation.to_string(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProvisionError::Status {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(
    operation: &str,
    response: Response,
) -> Result<T, ProvisionError> {
    response.json::<T>().await.map_err(|e| ProvisionError::Decode {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl AuthAdmin for SupabaseAdminClient {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, ProvisionError> {
        let mut page = 1usize;
        loop {
            let request = self.authed(self.http.get(self.admin_users_url())).query(&[
                ("page", page.to_string()),
                ("per_page", USERS_PER_PAGE.to_string()),
            ]);
            let response = send("list_users", request).await?;
            let body: UserPage = decode("list_users", response).await?;

            let found = body.users.iter().find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            });
            if let Some(user) = found {
                return Ok(Some(AuthUser {
                    id: user.id.clone(),
                    email: email.to_string(),
                }));
            }

            if body.users.len() < USERS_PER_PAGE {
                return Ok(None);
            }
            page += 1;
        }
    }

    async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, ProvisionError> {
        let payload = json!({
            "email": user.email,
            "password": user.password,
            "email_confirm": true,
            "user_metadata": {
                "role": user.role,
                "name": user.display_name,
            },
        });

        let request = self.authed(self.http.post(self.admin_users_url())).json(&payload);
        let response = send("create_user", request).await?;
        let body: UserBody = decode("create_user", response).await?;

        Ok(AuthUser {
            id: body.id,
            email: body.email.unwrap_or_else(|| user.email.clone()),
        })
    }

    async fn profile_exists(&self, user_id: &str) -> Result<bool, ProvisionError> {
        let request = self
            .authed(self.http.get(self.profile_url()))
            .query(&[("id", format!("eq.{user_id}")), ("select", "id".to_string())]);
        let response = send("select_profile", request).await?;
        let rows: Vec<serde_json::Value> = decode("select_profile", response).await?;

        Ok(!rows.is_empty())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProvisionError> {
        let request = self
            .authed(self.http.post(self.profile_url()))
            .header("Prefer", "return=minimal")
            .json(profile);
        send("insert_profile", request).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SupabaseAdminClient, SupabaseConfig};

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let config = SupabaseConfig::new("https://abc.supabase.co/", "key");
        assert_eq!(config.url, "https://abc.supabase.co");
    }

    #[test]
    fn endpoints_are_built_from_base_url() {
        let client =
            SupabaseAdminClient::new(SupabaseConfig::new("https://abc.supabase.co", "key")).unwrap();
        assert_eq!(
            client.admin_users_url(),
            "https://abc.supabase.co/auth/v1/admin/users"
        );
        assert_eq!(client.profile_url(), "https://abc.supabase.co/rest/v1/users");
    }
}
