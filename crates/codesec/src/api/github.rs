//! GitHub REST and GraphQL client.
//!
//! Implements [`CodeSecurityApi`] against github.com, GHE.com or a GitHub
//! Enterprise Server instance.
//!
//! # Rate Limiting
//!
//! Every organization costs several requests (membership, list, create or
//! delete, attach). Large batches should use a delay between organizations
//! or a small worker count.

use crate::api::CodeSecurityApi;
use crate::error::{Error, Result};
use crate::types::{
    AttachScope, ConfigurationDetails, ConfigurationUpdate, Membership, NewConfiguration,
    SecurityConfiguration, Settings, requested_dependabot_feature,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Body, RequestBuilder};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gh-security-config/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const TIMEOUT: Duration = Duration::from_secs(60);

/// Organizations fetched per GraphQL page (the API maximum).
const ORGS_PER_PAGE: u32 = 100;

const ORGANIZATIONS_QUERY: &str = "query($slug: String!, $first: Int!, $cursor: String) {
  enterprise(slug: $slug) {
    organizations(first: $first, after: $cursor) {
      nodes { login }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

/// REST and GraphQL base URLs for one GitHub instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rest: String,
    pub graphql: String,
}

impl Endpoints {
    #[must_use]
    pub fn github_com() -> Self {
        Self {
            rest: "https://api.github.com".to_string(),
            graphql: "https://api.github.com/graphql".to_string(),
        }
    }

    /// Endpoints for a hostname such as `github.example.com`.
    ///
    /// A scheme or trailing slash on the input is ignored.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');

        match host {
            "" | "github.com" | "api.github.com" => Self::github_com(),
            // GHE.com data residency: api.<subdomain>.ghe.com
            h if h.ends_with(".ghe.com") => {
                let h = h.trim_start_matches("api.");
                Self {
                    rest: format!("https://api.{h}"),
                    graphql: format!("https://api.{h}/graphql"),
                }
            }
            h => Self {
                rest: format!("https://{h}/api/v3"),
                graphql: format!("https://{h}/api/graphql"),
            },
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::github_com()
    }
}

/// Blocking GitHub client.
///
/// # Example
///
/// ```no_run
/// use codesec::{CodeSecurityApi, GitHubClient};
///
/// let client = GitHubClient::for_host("github.example.com", Some("ghp_xxx".to_string()));
/// let configs = client.list_configurations("octo-org").unwrap();
/// println!("{} configurations", configs.len());
/// ```
pub struct GitHubClient {
    agent: ureq::Agent,
    endpoints: Endpoints,
    token: Option<String>,
    user: OnceLock<String>,
}

impl GitHubClient {
    /// Client for github.com.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self::with_endpoints(Endpoints::github_com(), token)
    }

    #[must_use]
    pub fn for_host(host: &str, token: Option<String>) -> Self {
        Self::with_endpoints(Endpoints::for_host(host), token)
    }

    #[must_use]
    pub fn with_endpoints(endpoints: Endpoints, token: Option<String>) -> Self {
        // Statuses are turned into `Error::Api` with the body's message.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoints,
            token: token.filter(|t| !t.trim().is_empty()),
            user: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.rest, path)
    }

    fn configurations_path(org: &str) -> String {
        format!("/orgs/{org}/code-security/configurations")
    }

    fn configuration_path(org: &str, id: u64) -> String {
        format!("/orgs/{org}/code-security/configurations/{id}")
    }

    fn headers<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        log::trace!("GET {}", url);
        let mut response = check(self.headers(self.agent.get(&url)).call()?)?;
        Ok(response.body_mut().read_json()?)
    }

    fn send_json(
        &self,
        method: Method,
        url: &str,
        body: &impl serde::Serialize,
    ) -> Result<Response<Body>> {
        log::trace!("{:?} {}", method, url);
        let request = match method {
            Method::Post => self.agent.post(url),
            Method::Patch => self.agent.patch(url),
            Method::Put => self.agent.put(url),
        };
        check(self.headers(request).send_json(body)?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Patch,
    Put,
}

/// Turn a non-success response into `Error::Api`.
fn check(mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(Error::api(status.as_u16(), api_message(&body, status.canonical_reason())))
}

/// The `message` field of an error body, or the body itself.
fn api_message(body: &str, reason: Option<&str>) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => reason.unwrap_or("no message").to_string(),
    }
}

/// Refine a rejected create or update.
///
/// A 422 about a duplicate name means the configuration already exists. Any
/// other 422 while a Dependabot feature is requested means the instance
/// cannot provide it.
fn classify_rejection(err: Error, org: &str, name: &str, settings: &Settings) -> Error {
    if err.status() != Some(422) {
        return err;
    }

    let lower = err.to_string().to_lowercase();
    if lower.contains("already") && (lower.contains("name") || lower.contains("taken")) {
        return Error::ConfigurationExists {
            name: name.to_string(),
            org: org.to_string(),
        };
    }
    match requested_dependabot_feature(settings) {
        Some(feature) => Error::FeatureUnavailable {
            feature: feature.to_string(),
            org: org.to_string(),
        },
        None => err,
    }
}

// =============================================================================
// GraphQL response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnterpriseData {
    enterprise: Option<EnterpriseNode>,
}

#[derive(Debug, Deserialize)]
struct EnterpriseNode {
    organizations: OrganizationConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationConnection {
    nodes: Vec<OrganizationNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct OrganizationNode {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// Logins on one page plus the cursor of the next page, if any.
fn organizations_page(
    enterprise: &str,
    response: GraphQlResponse<EnterpriseData>,
) -> Result<(Vec<String>, Option<String>)> {
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Other(format!(
            "GraphQL query for enterprise '{}' failed: {}",
            enterprise,
            messages.join("; ")
        )));
    }

    let connection = response
        .data
        .and_then(|d| d.enterprise)
        .map(|e| e.organizations)
        .ok_or_else(|| Error::api(404, format!("enterprise '{enterprise}' not found")))?;

    let logins = connection.nodes.into_iter().map(|n| n.login).collect();
    let next = if connection.page_info.has_next_page {
        connection.page_info.end_cursor
    } else {
        None
    };
    Ok((logins, next))
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    state: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: u64,
}

impl CodeSecurityApi for GitHubClient {
    fn current_user(&self) -> Result<String> {
        if let Some(login) = self.user.get() {
            return Ok(login.clone());
        }
        if self.token.is_none() {
            return Err(Error::Auth(
                "no token provided; set GH_TOKEN or pass --token".to_string(),
            ));
        }

        let user: UserResponse = self.get_json("/user")?;
        log::debug!("Authenticated as {}", user.login);
        // A racing worker may have stored the same login first.
        let _ = self.user.set(user.login.clone());
        Ok(user.login)
    }

    fn membership(&self, org: &str) -> Result<Membership> {
        let user = self.current_user()?;
        match self.get_json::<MembershipResponse>(&format!("/orgs/{org}/memberships/{user}")) {
            Ok(m) => Ok(Membership::from_state(&m.state, &m.role)),
            Err(e) if e.is_not_found() => Ok(Membership::NotMember),
            Err(e) => Err(e),
        }
    }

    fn list_configurations(&self, org: &str) -> Result<Vec<SecurityConfiguration>> {
        self.get_json(&Self::configurations_path(org))
    }

    fn configuration_details(&self, org: &str, id: u64) -> Result<ConfigurationDetails> {
        let value: serde_json::Value = self.get_json(&Self::configuration_path(org, id))?;
        ConfigurationDetails::from_json(&value)
    }

    fn create_configuration(&self, org: &str, config: &NewConfiguration) -> Result<u64> {
        let url = self.url(&Self::configurations_path(org));
        let mut response = self
            .send_json(Method::Post, &url, config)
            .map_err(|e| classify_rejection(e, org, &config.name, &config.settings))?;
        let created: CreatedResponse = response.body_mut().read_json()?;
        Ok(created.id)
    }

    fn update_configuration(
        &self,
        org: &str,
        id: u64,
        update: &ConfigurationUpdate,
    ) -> Result<()> {
        let url = self.url(&Self::configuration_path(org, id));
        let name = update.name.as_deref().unwrap_or_default();
        self.send_json(Method::Patch, &url, update)
            .map_err(|e| classify_rejection(e, org, name, &update.settings))?;
        Ok(())
    }

    fn delete_configuration(&self, org: &str, id: u64) -> Result<()> {
        let url = self.url(&Self::configuration_path(org, id));
        log::trace!("DELETE {}", url);
        check(self.headers(self.agent.delete(&url)).call()?)?;
        Ok(())
    }

    fn attach_configuration(&self, org: &str, id: u64, scope: AttachScope) -> Result<()> {
        let url = self.url(&format!("{}/attach", Self::configuration_path(org, id)));
        self.send_json(Method::Post, &url, &json!({ "scope": scope }))?;
        Ok(())
    }

    fn set_default(&self, org: &str, id: u64) -> Result<()> {
        let url = self.url(&format!("{}/defaults", Self::configuration_path(org, id)));
        self.send_json(Method::Put, &url, &json!({ "default_for_new_repos": "all" }))?;
        Ok(())
    }

    fn enterprise_organizations(&self, enterprise: &str) -> Result<Vec<String>> {
        let mut logins = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = json!({
                "query": ORGANIZATIONS_QUERY,
                "variables": { "slug": enterprise, "first": ORGS_PER_PAGE, "cursor": cursor },
            });
            let mut response = self.send_json(Method::Post, &self.endpoints.graphql, &body)?;
            let page: GraphQlResponse<EnterpriseData> = response.body_mut().read_json()?;
            let (mut page_logins, next) = organizations_page(enterprise, page)?;
            log::debug!(
                "Fetched {} organizations from enterprise '{}'",
                page_logins.len(),
                enterprise
            );
            logins.append(&mut page_logins);

            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(logins)
    }
}
