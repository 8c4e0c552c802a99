//! OpenID Connect sign-in.
//!
//! Authorization-code flow with PKCE. The rest of the app only needs the
//! signed-in user's email and display name, so the ID token is verified
//! once at callback time and then discarded.

use anyhow::{anyhow, Context, Result};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreIdTokenClaims, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::OidcSettings;

/// Seconds a pending login may take before its state is discarded.
pub const AUTH_STATE_TTL_SECS: i64 = 300;

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")
}

/// Kept server-side between the login redirect and the callback.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub csrf_token: String,
    pub nonce: String,
    pub pkce_verifier: String,
    pub created_at: i64,
}

impl AuthState {
    fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > AUTH_STATE_TTL_SECS
    }
}

/// Who signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

pub struct OidcClient {
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: Option<ClientSecret>,
    redirect_url: RedirectUrl,
    scopes: Vec<String>,
}

impl OidcClient {
    /// Discovers the provider's metadata and builds the client.
    pub async fn new(settings: &OidcSettings) -> Result<Self> {
        info!(
            "Initializing OIDC client for provider: {}",
            settings.provider_url
        );

        let issuer_url =
            IssuerUrl::new(settings.provider_url.clone()).context("Invalid OIDC provider URL")?;
        let http = http_client()?;
        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http)
            .await
            .context("Failed to discover OIDC provider metadata")?;

        let redirect_url = RedirectUrl::new(settings.redirect_uri.clone())
            .context("Invalid OIDC redirect URI")?;

        Ok(Self {
            provider_metadata,
            client_id: ClientId::new(settings.client_id.clone()),
            client_secret: Some(ClientSecret::new(settings.client_secret.clone())),
            redirect_url,
            scopes: settings.scopes.clone(),
        })
    }

    /// Returns the provider URL to send the browser to, and the state the
    /// callback will be checked against.
    pub fn authorize_url(&self) -> (String, AuthState) {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();
        let state = AuthState {
            csrf_token: csrf_token.secret().clone(),
            nonce: nonce.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            created_at: chrono::Utc::now().timestamp(),
        };
        debug!("Generated authorization URL with state: {}", state.csrf_token);

        (auth_url.to_string(), state)
    }

    /// Exchanges the authorization code and verifies the returned ID token.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        stored_state: &AuthState,
    ) -> Result<OidcIdentity> {
        if state != stored_state.csrf_token {
            return Err(anyhow!("CSRF state mismatch"));
        }
        if stored_state.is_expired(chrono::Utc::now().timestamp()) {
            return Err(anyhow!("Authorization state expired"));
        }

        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let http = http_client()?;
        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))?
            .set_pkce_verifier(PkceCodeVerifier::new(stored_state.pkce_verifier.clone()))
            .request_async(&http)
            .await
            .map_err(|e| anyhow!("Failed to exchange authorization code: {}", e))?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| anyhow!("Server did not return an ID token"))?;

        let nonce = Nonce::new(stored_state.nonce.clone());
        let verifier = client.id_token_verifier();
        let claims: &CoreIdTokenClaims = id_token
            .claims(&verifier, &nonce)
            .map_err(|e| anyhow!("Failed to verify ID token: {}", e))?;

        let subject = claims.subject().to_string();
        let email = claims
            .email()
            .map(|e| e.to_string())
            .ok_or_else(|| anyhow!("ID token for {} carries no email", subject))?;
        let name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());

        debug!("Authenticated {} ({})", email, subject);
        Ok(OidcIdentity {
            subject,
            email,
            name,
        })
    }
}

/// Pending logins, keyed by CSRF token.
#[derive(Default)]
pub struct AuthStateStore {
    states: RwLock<HashMap<String, AuthState>>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, state: AuthState) {
        let key = state.csrf_token.clone();
        self.states.write().await.insert(key, state);
    }

    /// Removes and returns the state, so each login can complete only once.
    pub async fn take(&self, csrf_token: &str) -> Option<AuthState> {
        self.states.write().await.remove(csrf_token)
    }

    pub async fn cleanup_expired(&self) {
        let now = chrono::Utc::now().timestamp();
        self.states
            .write()
            .await
            .retain(|_, state| !state.is_expired(now));
    }
}
