//! HubSpace account login
//!
//! The cloud uses a Keycloak authorization-code flow with PKCE. There is no
//! public password grant, so the login form is fetched, its session
//! parameters scraped, and the credentials posted back; the redirect then
//! carries the authorization code that is exchanged for tokens.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::afero::AferoConfig;
use super::{BridgeError, BridgeResult, Credentials};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Tokens are refreshed this long before they expire
pub(crate) const REFRESH_MARGIN: Duration = Duration::from_secs(5);

/// PKCE verifier/challenge pair
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 40];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Session parameters scraped from the login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub session_code: String,
    pub execution: String,
    pub tab_id: String,
}

// Literal patterns, compiled once per process
static LOGIN_FORM_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<form[^>]*id="kc-form-login"[^>]*>"#).expect("valid form pattern")
});
static FORM_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"action="([^"]*)""#).expect("valid action pattern"));
static QUERY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]([^=&#]+)=([^&#]*)").expect("valid query pattern"));
static NAMED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="([^"]+)"[^>]*value="([^"]*)""#).expect("valid input pattern")
});

/// Value of the first `name`/`value` capture pair whose name matches
fn named_capture(re: &Regex, text: &str, name: &str) -> Option<String> {
    re.captures_iter(text)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
}

/// Read one form parameter from the action URL, falling back to a hidden
/// input of the same name
fn form_param(action: &str, html: &str, name: &str) -> Option<String> {
    named_capture(&QUERY_PARAM, action, name)
        .filter(|v| !v.is_empty())
        .or_else(|| named_capture(&NAMED_VALUE, html, name))
        .filter(|v| !v.is_empty())
}

/// Parse the `kc-form-login` form of the login page
pub fn parse_login_form(html: &str) -> BridgeResult<LoginForm> {
    let form_tag = LOGIN_FORM_TAG
        .find(html)
        .ok_or_else(|| BridgeError::Auth("Login form not found".to_string()))?
        .as_str();
    let action = FORM_ACTION
        .captures(form_tag)
        .map(|caps| caps[1].replace("&amp;", "&"))
        .unwrap_or_default();

    match (
        form_param(&action, html, "session_code"),
        form_param(&action, html, "execution"),
        form_param(&action, html, "tab_id"),
    ) {
        (Some(session_code), Some(execution), Some(tab_id)) => Ok(LoginForm {
            session_code,
            execution,
            tab_id,
        }),
        _ => Err(BridgeError::Auth("Missing session parameters".to_string())),
    }
}

/// Authorization code carried by the post-login redirect
pub fn extract_auth_code(location: &str) -> Option<String> {
    named_capture(&QUERY_PARAM, location, "code").filter(|code| !code.is_empty())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
}

/// Tokens of an authenticated account
#[derive(Debug, Clone)]
pub(crate) struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Instant,
    pub account_id: String,
}

impl TokenSet {
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN >= self.expires_at
    }
}

fn expiry(expires_in: u64) -> Instant {
    Instant::now() + Duration::from_secs(expires_in.saturating_sub(5))
}

fn joined_cookies(resp: &reqwest::Response) -> String {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter(|nv| !nv.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn token_request(
    http: &reqwest::Client,
    config: &AferoConfig,
    form: &[(&str, &str)],
) -> BridgeResult<TokenResponse> {
    let resp = http
        .post(config.auth_url("protocol/openid-connect/token"))
        .header(ACCEPT, "application/json")
        .form(form)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BridgeError::Auth(format!(
            "token request failed: {} {}",
            status, body
        )));
    }
    Ok(resp.json().await?)
}

/// Full login: form, credentials, code exchange, account lookup
pub(crate) async fn perform_login(
    http: &reqwest::Client,
    config: &AferoConfig,
    credentials: &Credentials,
) -> BridgeResult<TokenSet> {
    let pkce = Pkce::generate();
    info!(username = %credentials.username, "starting cloud login");

    let login_page = http
        .get(config.auth_url("protocol/openid-connect/auth"))
        .header(ACCEPT, HTML_ACCEPT)
        .query(&[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", "openid offline_access"),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
        ])
        .send()
        .await?;
    let cookies = joined_cookies(&login_page);
    let html = login_page.text().await?;
    let form = parse_login_form(&html)?;
    debug!("login form parsed");

    let submitted = http
        .post(config.auth_url("login-actions/authenticate"))
        .query(&[
            ("session_code", form.session_code.as_str()),
            ("execution", form.execution.as_str()),
            ("client_id", config.client_id.as_str()),
            ("tab_id", form.tab_id.as_str()),
        ])
        .header(ACCEPT, HTML_ACCEPT)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(COOKIE, cookies)
        .header(REFERER, config.auth_url("protocol/openid-connect/auth"))
        .form(&[
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("credentialId", ""),
        ])
        .send()
        .await?;

    let location = submitted
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let code = extract_auth_code(location).ok_or_else(|| {
        BridgeError::Auth(format!(
            "No auth code in response; status {}",
            submitted.status()
        ))
    })?;

    let tokens = token_request(
        http,
        config,
        &[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code", code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
        ],
    )
    .await?;

    let me: Value = http
        .get(config.api_url("v1/users/me"))
        .bearer_auth(&tokens.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let account_id = me
        .pointer("/accountAccess/0/account/accountId")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::Auth("Unable to resolve accountId".to_string()))?
        .to_string();

    info!(account = %account_id, "cloud login complete");
    Ok(TokenSet {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token.unwrap_or_default(),
        expires_at: expiry(tokens.expires_in),
        account_id,
    })
}

/// Exchange the refresh token for a new access token
pub(crate) async fn refresh_tokens(
    http: &reqwest::Client,
    config: &AferoConfig,
    tokens: &mut TokenSet,
) -> BridgeResult<()> {
    if tokens.refresh_token.is_empty() {
        return Err(BridgeError::Auth("Invalid session".to_string()));
    }

    let refreshed = token_request(
        http,
        config,
        &[
            ("grant_type", "refresh_token"),
            ("client_id", config.client_id.as_str()),
            ("refresh_token", tokens.refresh_token.as_str()),
            ("scope", "openid email offline_access profile"),
        ],
    )
    .await?;

    tokens.access_token = refreshed.access_token;
    if let Some(refresh_token) = refreshed.refresh_token {
        tokens.refresh_token = refresh_token;
    }
    tokens.expires_at = expiry(refreshed.expires_in);
    debug!(account = %tokens.account_id, "access token refreshed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
        <html><body>
        <form id="kc-form-login" class="form" onsubmit="return true;"
              action="https://accounts.example.com/auth/realms/thd/login-actions/authenticate?session_code=abc123&amp;execution=exec-9&amp;client_id=hubspace_android&amp;tab_id=tab7"
              method="post">
          <input name="username" />
        </form>
        </body></html>"#;

    #[test]
    fn test_parse_login_form_from_action() {
        let form = parse_login_form(LOGIN_PAGE).unwrap();
        assert_eq!(
            form,
            LoginForm {
                session_code: "abc123".into(),
                execution: "exec-9".into(),
                tab_id: "tab7".into(),
            }
        );
    }

    #[test]
    fn test_parse_login_form_hidden_inputs() {
        let html = r#"<form action="/authenticate" id="kc-form-login">
            <input type="hidden" name="session_code" value="s1">
            <input type="hidden" name="execution" value="e1">
            <input type="hidden" name="tab_id" value="t1">
        </form>"#;
        let form = parse_login_form(html).unwrap();
        assert_eq!(form.session_code, "s1");
        assert_eq!(form.execution, "e1");
        assert_eq!(form.tab_id, "t1");
    }

    #[test]
    fn test_parse_login_form_mixes_action_and_inputs() {
        // empty action values fall back to hidden inputs; pages parse repeatedly
        let html = r#"<form id="kc-form-login" action="/auth?session_code=&amp;execution=e2">
            <input type="hidden" name="session_code" value="s2">
            <input name="username" />
            <input type="hidden" name="tab_id" value="t2">
        </form>"#;
        for _ in 0..3 {
            let form = parse_login_form(html).unwrap();
            assert_eq!(
                form,
                LoginForm {
                    session_code: "s2".into(),
                    execution: "e2".into(),
                    tab_id: "t2".into(),
                }
            );
        }
    }

    #[test]
    fn test_parse_login_form_errors() {
        assert!(matches!(
            parse_login_form("<html>no form</html>"),
            Err(BridgeError::Auth(msg)) if msg == "Login form not found"
        ));
        assert!(matches!(
            parse_login_form(r#"<form id="kc-form-login" action="/x?session_code=a">"#),
            Err(BridgeError::Auth(msg)) if msg == "Missing session parameters"
        ));
    }

    #[test]
    fn test_extract_auth_code() {
        assert_eq!(
            extract_auth_code("hubspace-app://loginredirect?state=x&code=the-code&session_state=y"),
            Some("the-code".to_string())
        );
        assert_eq!(extract_auth_code("hubspace-app://loginredirect?error=denied"), None);
    }

    #[test]
    fn test_pkce_challenge_is_sha256_of_verifier() {
        // RFC 7636 appendix B
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");

        let generated = Pkce::generate();
        assert!(generated
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(generated.verifier.len(), 54);
    }
}
