//! Azure DevOps REST backend.
//!
//! This module provides the [`RestBackend`] implementation, a blocking
//! client for the Azure DevOps REST API built on `ureq`.
//!
//! # Authentication
//!
//! Requests carry HTTP Basic credentials with an empty user name and the
//! personal access token as password.

use crate::backend::Backend;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::types::{
    Commit, GitRef, GitRepository, InitType, NewProject, NewRepository, Operation,
    OperationStatus, Organization, Process, Project, ProjectPatch, Push, PushResult, RefUpdate,
    RefUpdateResult, RefUpdateStatus, RepositoryPatch, VersionControl, Visibility,
};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ureq::http::Response;
use ureq::{Agent, Body};

/// Account service used to look up organization metadata.
const ACCOUNTS_BASE: &str = "https://app.vssps.visualstudio.com";

/// Response header carrying the Entra tenant backing the organization.
const TENANT_HEADER: &str = "x-vss-resourcetenant";

const USER_AGENT: &str = concat!("azdo/", env!("CARGO_PKG_VERSION"));

/// Azure DevOps REST backend.
///
/// # Example
///
/// ```no_run
/// use azdokit::backend::Backend;
/// use azdokit::backend::rest::RestBackend;
/// use azdokit::ProviderConfig;
///
/// let config = ProviderConfig::from_env().unwrap();
/// let backend = RestBackend::new(&config);
/// let org = backend.organization().unwrap();
/// println!("{} ({})", org.name, org.id);
/// ```
pub struct RestBackend {
    /// HTTP agent for requests.
    agent: Agent,
    /// Organization URL without trailing slash.
    org_url: String,
    /// Account service base URL.
    accounts_base: String,
    /// REST API version.
    api_version: String,
    /// Precomputed `Authorization` header value.
    authorization: String,
}

impl RestBackend {
    /// Create a backend for the configured organization.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false)
            .build();
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!(":{}", config.personal_access_token));

        Self {
            agent: Agent::new_with_config(agent_config),
            org_url: config.organization_url().to_string(),
            accounts_base: ACCOUNTS_BASE.to_string(),
            api_version: config.api_version.clone(),
            authorization: format!("Basic {credentials}"),
        }
    }

    /// Use a different account service (for testing).
    #[must_use]
    pub fn with_accounts_base(mut self, accounts_base: impl Into<String>) -> Self {
        self.accounts_base = accounts_base.into();
        self
    }

    /// Get the organization URL requests are sent to.
    #[must_use]
    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    /// Build an organization-level API URL.
    fn api_url(&self, path: &str) -> String {
        format!("{}/_apis/{}", self.org_url, path)
    }

    /// Build a URL below a git repository.
    fn repo_url(&self, repository_id: &str, rest: &str) -> String {
        let base = self.api_url(&format!(
            "git/repositories/{}",
            urlencoding::encode(repository_id)
        ));
        if rest.is_empty() {
            base
        } else {
            format!("{base}/{rest}")
        }
    }

    fn get(&self, url: &str) -> ureq::RequestBuilder<ureq::typestate::WithoutBody> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .query("api-version", &self.api_version)
    }

    fn delete(&self, url: &str) -> ureq::RequestBuilder<ureq::typestate::WithoutBody> {
        log::debug!("DELETE {url}");
        self.agent
            .delete(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .query("api-version", &self.api_version)
    }

    fn post(&self, url: &str) -> ureq::RequestBuilder<ureq::typestate::WithBody> {
        log::debug!("POST {url}");
        self.agent
            .post(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .query("api-version", &self.api_version)
    }

    fn patch(&self, url: &str) -> ureq::RequestBuilder<ureq::typestate::WithBody> {
        log::debug!("PATCH {url}");
        self.agent
            .patch(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .query("api-version", &self.api_version)
    }

    fn operation_ref(response: std::result::Result<Response<Body>, ureq::Error>) -> Result<Operation> {
        let wire: WireOperation = read_json(response)?;
        Ok(wire.into())
    }
}

impl Backend for RestBackend {
    fn organization(&self) -> Result<Organization> {
        let mut response = check(self.get(&self.api_url("connectionData")).call())?;
        let tenant_id = response
            .headers()
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let connection: WireConnectionData = response.body_mut().read_json()?;

        let url = format!("{}/_apis/accounts", self.accounts_base);
        let accounts: WireList<WireAccount> = read_json(
            self.get(&url)
                .query("memberId", &connection.authenticated_user.id)
                .call(),
        )?;

        let account = accounts
            .value
            .into_iter()
            .find(|a| a.account_id.eq_ignore_ascii_case(&connection.instance_id))
            .ok_or_else(|| Error::not_found("organization", &self.org_url))?;

        Ok(Organization {
            id: account.account_id,
            name: account.account_name,
            owner_id: account.account_owner.unwrap_or_default(),
            status: account.account_status.unwrap_or_else(|| "enabled".to_string()),
            tenant_id,
        })
    }

    fn get_project(&self, id_or_name: &str) -> Result<Option<Project>> {
        let url = self.api_url(&format!("projects/{}", urlencoding::encode(id_or_name)));
        let response = self.get(&url).query("includeCapabilities", "true").call();
        optional(read_json::<WireProject>(response))?
            .map(Project::try_from)
            .transpose()
    }

    fn list_processes(&self) -> Result<Vec<Process>> {
        let list: WireList<WireProcess> =
            read_json(self.get(&self.api_url("process/processes")).call())?;
        Ok(list.value.into_iter().map(Into::into).collect())
    }

    fn queue_create_project(&self, project: &NewProject) -> Result<Operation> {
        let body = WireNewProject {
            name: &project.name,
            description: &project.description,
            visibility: project.visibility,
            capabilities: WireCapabilities {
                versioncontrol: WireVersionControl {
                    source_control_type: project.version_control.as_str().to_string(),
                },
                process_template: WireProcessTemplate {
                    template_name: None,
                    template_type_id: project.process_template_id.clone(),
                },
            },
        };
        Self::operation_ref(self.post(&self.api_url("projects")).send_json(&body))
    }

    fn queue_update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Operation> {
        let url = self.api_url(&format!("projects/{}", urlencoding::encode(id)));
        let body = WireProjectPatch {
            name: patch.name.as_deref(),
            description: patch.description.as_deref(),
            visibility: patch.visibility,
        };
        Self::operation_ref(self.patch(&url).send_json(&body))
    }

    fn queue_delete_project(&self, id: &str) -> Result<Operation> {
        let url = self.api_url(&format!("projects/{}", urlencoding::encode(id)));
        Self::operation_ref(self.delete(&url).call())
    }

    fn get_operation(&self, id: &str) -> Result<Operation> {
        let url = self.api_url(&format!("operations/{}", urlencoding::encode(id)));
        Self::operation_ref(self.get(&url).call())
    }

    fn get_repository(&self, id: &str) -> Result<Option<GitRepository>> {
        let response = self.get(&self.repo_url(id, "")).call();
        Ok(optional(read_json::<WireRepository>(response))?.map(Into::into))
    }

    fn create_repository(&self, repository: &NewRepository) -> Result<GitRepository> {
        let body = WireNewRepository {
            name: &repository.name,
            project: WireProjectRef {
                id: &repository.project_id,
            },
        };
        let wire: WireRepository =
            read_json(self.post(&self.api_url("git/repositories")).send_json(&body))?;
        Ok(wire.into())
    }

    fn update_repository(&self, id: &str, patch: &RepositoryPatch) -> Result<GitRepository> {
        let body = WireRepositoryPatch {
            name: patch.name.as_deref(),
            default_branch: patch.default_branch.as_deref(),
        };
        let wire: WireRepository = read_json(self.patch(&self.repo_url(id, "")).send_json(&body))?;
        Ok(wire.into())
    }

    fn delete_repository(&self, id: &str) -> Result<()> {
        check(self.delete(&self.repo_url(id, "")).call())?;
        Ok(())
    }

    fn push(&self, repository_id: &str, push: &Push) -> Result<PushResult> {
        let body = WirePush::from(push);
        let wire: WirePushResult =
            read_json(self.post(&self.repo_url(repository_id, "pushes")).send_json(&body))?;
        let commit_id = wire
            .commits
            .into_iter()
            .next()
            .map(|c| c.commit_id)
            .ok_or_else(|| Error::InvalidResponse("push returned no commits".to_string()))?;
        Ok(PushResult {
            push_id: wire.push_id,
            commit_id,
        })
    }

    fn list_refs(&self, repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        let response = self
            .get(&self.repo_url(repository_id, "refs"))
            .query("filter", filter)
            .query("peelTags", "true")
            .call();
        let list: WireList<WireRef> = read_json(response)?;
        Ok(list.value.into_iter().map(Into::into).collect())
    }

    fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<Option<Commit>> {
        let url = self.repo_url(
            repository_id,
            &format!("commits/{}", urlencoding::encode(commit_id)),
        );
        let response = self.get(&url).call();
        Ok(optional(read_json::<WireCommit>(response))?.map(Into::into))
    }

    fn update_refs(
        &self,
        repository_id: &str,
        updates: &[RefUpdate],
    ) -> Result<Vec<RefUpdateResult>> {
        let body: Vec<WireRefUpdate<'_>> = updates.iter().map(WireRefUpdate::from).collect();
        let list: WireList<WireRefUpdateResult> =
            read_json(self.post(&self.repo_url(repository_id, "refs")).send_json(&body))?;
        Ok(list.value.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Turn a non-2xx response into a classified error.
fn check(
    response: std::result::Result<Response<Body>, ureq::Error>,
) -> Result<Response<Body>> {
    let mut response = response?;
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    let text = response.body_mut().read_to_string().unwrap_or_default();
    log::debug!("HTTP {status}: {text}");
    Err(api_error(status, &text))
}

fn read_json<T: DeserializeOwned>(
    response: std::result::Result<Response<Body>, ureq::Error>,
) -> Result<T> {
    let mut response = check(response)?;
    Ok(response.body_mut().read_json()?)
}

/// Map a not-found error to `None`.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Build an error from a status code and the service's error body.
fn api_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<WireError>(body) {
        Ok(wire) => Error::Api {
            status,
            type_key: wire.type_key,
            message: wire.message,
        },
        Err(_) => {
            let message = if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            };
            Error::api(status, message)
        }
    }
}

// =============================================================================
// Azure DevOps API wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireError {
    message: String,
    type_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConnectionData {
    authenticated_user: WireIdentity,
    instance_id: String,
}

#[derive(Debug, Deserialize)]
struct WireIdentity {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    account_id: String,
    account_name: String,
    account_owner: Option<String>,
    account_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProject {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    visibility: Visibility,
    #[serde(default)]
    capabilities: Option<WireCapabilities>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCapabilities {
    versioncontrol: WireVersionControl,
    process_template: WireProcessTemplate,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVersionControl {
    source_control_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProcessTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    template_name: Option<String>,
    template_type_id: String,
}

impl TryFrom<WireProject> for Project {
    type Error = Error;

    fn try_from(p: WireProject) -> Result<Self> {
        let capabilities = p.capabilities.ok_or_else(|| {
            Error::InvalidResponse(format!("project {} has no capabilities", p.id))
        })?;
        let version_control = capabilities
            .versioncontrol
            .source_control_type
            .parse::<VersionControl>()
            .map_err(Error::InvalidResponse)?;
        Ok(Self {
            id: p.id,
            name: p.name,
            description: p.description.unwrap_or_default(),
            visibility: p.visibility,
            version_control,
            work_item_template: capabilities.process_template.template_name.unwrap_or_default(),
            process_template_id: capabilities.process_template.template_type_id,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireNewProject<'a> {
    name: &'a str,
    description: &'a str,
    visibility: Visibility,
    capabilities: WireCapabilities,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireProjectPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProcess {
    id: String,
    name: String,
    #[serde(default)]
    is_default: bool,
}

impl From<WireProcess> for Process {
    fn from(p: WireProcess) -> Self {
        Self {
            id: p.id,
            name: p.name,
            is_default: p.is_default,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOperation {
    id: String,
    status: OperationStatus,
    #[serde(default)]
    result_message: Option<String>,
}

impl From<WireOperation> for Operation {
    fn from(o: WireOperation) -> Self {
        Self {
            id: o.id,
            status: o.status,
            result_message: o.result_message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireProjectRef<T> {
    id: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRepository {
    id: String,
    name: String,
    project: WireProjectRef<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    remote_url: String,
    #[serde(default)]
    size: u64,
}

impl From<WireRepository> for GitRepository {
    fn from(r: WireRepository) -> Self {
        Self {
            id: r.id,
            project_id: r.project.id,
            name: r.name,
            default_branch: r.default_branch,
            url: r.url,
            remote_url: r.remote_url,
            size: r.size,
            initialization: InitType::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireNewRepository<'a> {
    name: &'a str,
    project: WireProjectRef<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRepositoryPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePush<'a> {
    ref_updates: Vec<WirePushRef<'a>>,
    commits: Vec<WirePushCommit<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePushRef<'a> {
    name: &'a str,
    old_object_id: &'a str,
}

#[derive(Debug, Serialize)]
struct WirePushCommit<'a> {
    comment: &'a str,
    changes: Vec<WireChange<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireChange<'a> {
    change_type: &'static str,
    item: WireItem<'a>,
    new_content: WireContent<'a>,
}

#[derive(Debug, Serialize)]
struct WireItem<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireContent<'a> {
    content: &'a str,
    content_type: &'static str,
}

impl<'a> From<&'a Push> for WirePush<'a> {
    fn from(push: &'a Push) -> Self {
        Self {
            ref_updates: vec![WirePushRef {
                name: &push.ref_name,
                old_object_id: &push.old_object_id,
            }],
            commits: vec![WirePushCommit {
                comment: &push.comment,
                changes: push
                    .changes
                    .iter()
                    .map(|change| WireChange {
                        change_type: "add",
                        item: WireItem { path: &change.path },
                        new_content: WireContent {
                            content: &change.content,
                            content_type: "rawtext",
                        },
                    })
                    .collect(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePushResult {
    push_id: u64,
    #[serde(default)]
    commits: Vec<WireCommit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRef {
    name: String,
    object_id: String,
    #[serde(default)]
    peeled_object_id: Option<String>,
}

impl From<WireRef> for GitRef {
    fn from(r: WireRef) -> Self {
        Self {
            name: r.name,
            object_id: r.object_id,
            peeled_object_id: r.peeled_object_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCommit {
    commit_id: String,
    #[serde(default)]
    comment: Option<String>,
}

impl From<WireCommit> for Commit {
    fn from(c: WireCommit) -> Self {
        Self {
            commit_id: c.commit_id,
            comment: c.comment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRefUpdate<'a> {
    name: &'a str,
    old_object_id: &'a str,
    new_object_id: &'a str,
}

impl<'a> From<&'a RefUpdate> for WireRefUpdate<'a> {
    fn from(u: &'a RefUpdate) -> Self {
        Self {
            name: &u.name,
            old_object_id: &u.old_object_id,
            new_object_id: &u.new_object_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRefUpdateResult {
    name: String,
    #[serde(default)]
    old_object_id: String,
    #[serde(default)]
    new_object_id: String,
    success: bool,
    update_status: RefUpdateStatus,
    #[serde(default)]
    custom_message: Option<String>,
}

impl From<WireRefUpdateResult> for RefUpdateResult {
    fn from(r: WireRefUpdateResult) -> Self {
        Self {
            name: r.name,
            old_object_id: r.old_object_id,
            new_object_id: r.new_object_id,
            success: r.success,
            update_status: r.update_status,
            custom_message: r.custom_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::FileChange;

    fn backend() -> RestBackend {
        RestBackend::new(&ProviderConfig::new("https://dev.azure.com/contoso/", "pat"))
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(backend.org_url(), "https://dev.azure.com/contoso");
        assert_eq!(
            backend.api_url("projects"),
            "https://dev.azure.com/contoso/_apis/projects"
        );
        assert_eq!(
            backend.repo_url("a b", "refs"),
            "https://dev.azure.com/contoso/_apis/git/repositories/a%20b/refs"
        );
        assert_eq!(
            backend.repo_url("r1", ""),
            "https://dev.azure.com/contoso/_apis/git/repositories/r1"
        );
    }

    #[test]
    fn test_authorization_header() {
        // base64(":pat")
        assert_eq!(backend().authorization, "Basic OnBhdA==");
    }

    #[test]
    fn test_api_error_from_service_body() {
        let body = r#"{"$id":"1","innerException":null,"message":"TF400948: A Git repository with the name app already exists.","typeName":"Microsoft.TeamFoundation.Git.Server.GitRepositoryNameAlreadyExistsException","typeKey":"GitRepositoryNameAlreadyExistsException","errorCode":0,"eventId":3000}"#;
        let err = api_error(409, body);
        assert!(err.is_conflict());
        assert!(err.to_string().contains("TF400948"));
    }

    #[test]
    fn test_api_error_from_plain_body() {
        let err = api_error(503, "");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("HTTP 503"));

        let err = api_error(401, "Unauthorized");
        assert_eq!(err.category(), ErrorCategory::Fatal);
    }

    #[test]
    fn test_optional_maps_not_found() {
        let missing: Result<u8> = Err(Error::api(404, "gone"));
        assert_eq!(optional(missing).unwrap(), None);

        let failed: Result<u8> = Err(Error::api(500, "boom"));
        assert!(optional(failed).is_err());
    }

    #[test]
    fn test_parse_refs() {
        let json = r#"{"value":[
            {"name":"refs/tags/v1","objectId":"aaaa","peeledObjectId":"bbbb","creator":{}},
            {"name":"refs/tags/v10","objectId":"cccc"}
        ],"count":2}"#;
        let list: WireList<WireRef> = serde_json::from_str(json).unwrap();
        let refs: Vec<GitRef> = list.value.into_iter().map(Into::into).collect();
        assert_eq!(refs[0].commit_id(), "bbbb");
        assert_eq!(refs[1].commit_id(), "cccc");
    }

    #[test]
    fn test_parse_ref_update_results() {
        let json = r#"{"value":[{"repositoryId":"r1","name":"refs/heads/a","oldObjectId":"0000000000000000000000000000000000000000","newObjectId":"abc","isLocked":false,"updateStatus":"staleOldObjectId","success":false}],"count":1}"#;
        let list: WireList<WireRefUpdateResult> = serde_json::from_str(json).unwrap();
        let result: RefUpdateResult = list.value.into_iter().next().unwrap().into();
        assert!(!result.success);
        assert_eq!(result.update_status, RefUpdateStatus::StaleOldObjectId);
        assert_eq!(result.custom_message, None);
    }

    #[test]
    fn test_parse_project_with_capabilities() {
        let json = r#"{
            "id":"p1","name":"demo","description":"d","visibility":"private",
            "capabilities":{
                "versioncontrol":{"sourceControlType":"Git","gitEnabled":"true"},
                "processTemplate":{"templateName":"Agile","templateTypeId":"adcc42ab"}
            }
        }"#;
        let wire: WireProject = serde_json::from_str(json).unwrap();
        let project = Project::try_from(wire).unwrap();
        assert_eq!(project.version_control, VersionControl::Git);
        assert_eq!(project.work_item_template, "Agile");
        assert_eq!(project.process_template_id, "adcc42ab");
    }

    #[test]
    fn test_parse_operation() {
        let json = r#"{"id":"op1","status":"inProgress","url":"https://x"}"#;
        let op: Operation = serde_json::from_str::<WireOperation>(json).unwrap().into();
        assert_eq!(op.status, OperationStatus::InProgress);
        assert!(!op.status.is_terminal());
    }

    #[test]
    fn test_push_body_shape() {
        let push = Push {
            ref_name: "refs/heads/master".to_string(),
            old_object_id: crate::types::ZERO_OBJECT_ID.to_string(),
            comment: "Initial commit.".to_string(),
            changes: vec![FileChange {
                path: "/README.md".to_string(),
                content: "# app".to_string(),
            }],
        };
        let value = serde_json::to_value(WirePush::from(&push)).unwrap();
        assert_eq!(value["refUpdates"][0]["name"], "refs/heads/master");
        assert_eq!(value["commits"][0]["changes"][0]["changeType"], "add");
        assert_eq!(value["commits"][0]["changes"][0]["item"]["path"], "/README.md");
        assert_eq!(
            value["commits"][0]["changes"][0]["newContent"]["contentType"],
            "rawtext"
        );
    }

    #[test]
    fn test_ref_update_body_shape() {
        let update = RefUpdate::create("refs/heads/a", "abc");
        let value = serde_json::to_value(vec![WireRefUpdate::from(&update)]).unwrap();
        assert_eq!(value[0]["oldObjectId"], crate::types::ZERO_OBJECT_ID);
        assert_eq!(value[0]["newObjectId"], "abc");
    }
}
