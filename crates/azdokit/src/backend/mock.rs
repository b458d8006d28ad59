//! In-memory backend for testing without network access.
//!
//! [`MockBackend`] keeps a whole organization in memory (projects,
//! processes, queued operations, repositories, commits and refs) and follows
//! the service's ref update rules: `oldObjectId` must match the current
//! target and the all-zero id means create or delete. Failures can be
//! scripted per method to exercise retry paths.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    Commit, GitRef, GitRepository, InitType, NewProject, NewRepository, Operation,
    OperationStatus, Organization, Process, Project, ProjectPatch, Push, PushResult, RefUpdate,
    RefUpdateResult, RefUpdateStatus, RepositoryPatch, VersionControl, Visibility, ZERO_OBJECT_ID,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// When a scripted failure fires relative to the call's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePoint {
    /// The call fails without touching state.
    Before,
    /// The call takes effect, then the response is lost.
    After,
}

#[derive(Debug)]
struct ScriptedFailure {
    method: &'static str,
    point: FailurePoint,
    remaining: u32,
    status: u16,
}

#[derive(Debug)]
struct State {
    organization: Organization,
    processes: Vec<Process>,
    projects: HashMap<String, Project>,
    operations: HashMap<String, (Operation, u32)>,
    operation_polls: u32,
    repositories: HashMap<String, GitRepository>,
    commits: HashMap<String, HashMap<String, Commit>>,
    refs: HashMap<String, BTreeMap<String, GitRef>>,
    next_id: u64,
    failures: Vec<ScriptedFailure>,
    calls: HashMap<&'static str, usize>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn new_guid(&mut self) -> String {
        format!("00000000-0000-4000-8000-{:012x}", self.next_id())
    }

    fn new_object_id(&mut self) -> String {
        format!("c0ffee{:034x}", self.next_id())
    }

    fn take_failure(&mut self, method: &str, point: FailurePoint) -> Option<u16> {
        let failure = self
            .failures
            .iter_mut()
            .find(|f| f.method == method && f.point == point && f.remaining > 0)?;
        failure.remaining -= 1;
        Some(failure.status)
    }

    fn queue_operation(&mut self) -> Operation {
        let operation = Operation {
            id: self.new_guid(),
            status: OperationStatus::Queued,
            result_message: None,
        };
        let polls = self.operation_polls;
        self.operations
            .insert(operation.id.clone(), (operation.clone(), polls));
        operation
    }

    fn find_project(&self, id_or_name: &str) -> Option<&Project> {
        self.projects.get(id_or_name).or_else(|| {
            self.projects
                .values()
                .find(|p| p.name.eq_ignore_ascii_case(id_or_name))
        })
    }

    fn require_repository(&self, id: &str) -> Result<()> {
        if self.repositories.contains_key(id) {
            Ok(())
        } else {
            Err(repository_not_found(id))
        }
    }

    fn current_target(&self, repository_id: &str, name: &str) -> Option<String> {
        self.refs
            .get(repository_id)
            .and_then(|refs| refs.get(name))
            .map(|r| r.object_id.clone())
    }

    fn set_ref(&mut self, repository_id: &str, name: &str, object_id: &str) {
        self.refs.entry(repository_id.to_string()).or_default().insert(
            name.to_string(),
            GitRef {
                name: name.to_string(),
                object_id: object_id.to_string(),
                peeled_object_id: None,
            },
        );
    }

    fn add_commit(&mut self, repository_id: &str, comment: &str) -> String {
        let commit_id = self.new_object_id();
        self.commits
            .entry(repository_id.to_string())
            .or_default()
            .insert(
                commit_id.clone(),
                Commit {
                    commit_id: commit_id.clone(),
                    comment: Some(comment.to_string()),
                },
            );
        commit_id
    }

    fn apply_ref_update(&mut self, repository_id: &str, update: &RefUpdate) -> RefUpdateResult {
        let current = self.current_target(repository_id, &update.name);
        let status = if !is_valid_ref_name(&update.name) {
            RefUpdateStatus::InvalidRefName
        } else if current.as_deref().unwrap_or(ZERO_OBJECT_ID) != update.old_object_id {
            RefUpdateStatus::StaleOldObjectId
        } else if update.new_object_id == ZERO_OBJECT_ID {
            if let Some(refs) = self.refs.get_mut(repository_id) {
                refs.remove(&update.name);
            }
            RefUpdateStatus::Succeeded
        } else if !self
            .commits
            .get(repository_id)
            .is_some_and(|c| c.contains_key(&update.new_object_id))
        {
            RefUpdateStatus::UnresolvableToCommit
        } else {
            self.set_ref(repository_id, &update.name, &update.new_object_id);
            RefUpdateStatus::Succeeded
        };

        RefUpdateResult {
            name: update.name.clone(),
            old_object_id: update.old_object_id.clone(),
            new_object_id: update.new_object_id.clone(),
            success: status.is_success(),
            update_status: status,
            custom_message: None,
        }
    }
}

fn is_valid_ref_name(name: &str) -> bool {
    name.starts_with("refs/")
        && !name.ends_with('/')
        && !name.contains("..")
        && !name.contains("//")
        && !name
            .chars()
            .any(|c| c.is_ascii_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
}

fn repository_not_found(id: &str) -> Error {
    Error::Api {
        status: 404,
        type_key: Some("GitRepositoryNotFoundException".to_string()),
        message: format!("TF401019: The Git repository with name or identifier {id} does not exist"),
    }
}

fn project_not_found(id: &str) -> Error {
    Error::Api {
        status: 404,
        type_key: Some("ProjectDoesNotExistException".to_string()),
        message: format!("TF200016: The following project does not exist: {id}"),
    }
}

/// Mock backend for testing without network access.
///
/// Clones share the same organization, so a test can keep one clone to
/// inspect state while a client owns another.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an organization with the stock processes and nothing else.
    #[must_use]
    pub fn new() -> Self {
        let process = |id: &str, name: &str, is_default: bool| Process {
            id: id.to_string(),
            name: name.to_string(),
            is_default,
        };
        let state = State {
            organization: Organization {
                id: "4c1b3b8e-9f3a-4d1e-8a0c-5f2b7c9d1e20".to_string(),
                name: "contoso".to_string(),
                owner_id: "9d2e6f10-3c4b-4a5d-9e8f-0a1b2c3d4e5f".to_string(),
                status: "enabled".to_string(),
                tenant_id: "72f988bf-86f1-41af-91ab-2d7cd011db47".to_string(),
            },
            processes: vec![
                process("adcc42ab-9882-485e-a3ed-7678f01f66bc", "Agile", true),
                process("6b724908-ef14-45cf-84f8-768b5384da45", "Scrum", false),
                process("27450541-8e31-4150-9947-dc59f998fc01", "CMMI", false),
                process("b8a3a935-7e91-48b8-a94c-606d37c3e9f2", "Basic", false),
            ],
            projects: HashMap::new(),
            operations: HashMap::new(),
            operation_polls: 0,
            repositories: HashMap::new(),
            commits: HashMap::new(),
            refs: HashMap::new(),
            next_id: 0,
            failures: Vec::new(),
            calls: HashMap::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and fire any failure scripted to precede it.
    fn begin(&self, method: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        *state.calls.entry(method).or_default() += 1;
        if let Some(status) = state.take_failure(method, FailurePoint::Before) {
            return Err(injected(method, status));
        }
        Ok(state)
    }

    /// Fire any failure scripted to follow a successful call.
    fn finish<T>(state: &mut State, method: &'static str, result: Result<T>) -> Result<T> {
        if result.is_ok()
            && let Some(status) = state.take_failure(method, FailurePoint::After)
        {
            return Err(injected(method, status));
        }
        result
    }

    // -------------------------------------------------------------------------
    // Seeding and inspection
    // -------------------------------------------------------------------------

    /// Add a project directly (no queued operation).
    pub fn seed_project(&self, name: &str) -> Project {
        let mut state = self.state();
        let project = Project {
            id: state.new_guid(),
            name: name.to_string(),
            description: String::new(),
            visibility: Visibility::Private,
            version_control: VersionControl::Git,
            work_item_template: "Agile".to_string(),
            process_template_id: state.processes[0].id.clone(),
        };
        state.projects.insert(project.id.clone(), project.clone());
        project
    }

    /// Add an empty repository to a project.
    pub fn seed_repository(&self, project_id: &str, name: &str) -> GitRepository {
        let mut state = self.state();
        let id = state.new_guid();
        let repository = GitRepository {
            url: format!("https://dev.azure.com/contoso/_apis/git/repositories/{id}"),
            remote_url: format!("https://contoso@dev.azure.com/contoso/{project_id}/_git/{name}"),
            id,
            project_id: project_id.to_string(),
            name: name.to_string(),
            default_branch: None,
            size: 0,
            initialization: InitType::Uninitialized,
        };
        state
            .repositories
            .insert(repository.id.clone(), repository.clone());
        repository
    }

    /// Add a commit and point `ref_name` at it. Returns the commit id.
    pub fn seed_commit(&self, repository_id: &str, ref_name: &str, comment: &str) -> String {
        let mut state = self.state();
        let commit_id = state.add_commit(repository_id, comment);
        state.set_ref(repository_id, ref_name, &commit_id);
        commit_id
    }

    /// Add a commit no ref points at. Returns the commit id.
    pub fn seed_dangling_commit(&self, repository_id: &str, comment: &str) -> String {
        self.state().add_commit(repository_id, comment)
    }

    /// Add an annotated tag pointing at `commit_id`. Returns the tag object id.
    pub fn seed_annotated_tag(&self, repository_id: &str, tag: &str, commit_id: &str) -> String {
        let mut state = self.state();
        let tag_object_id = state.new_object_id();
        let name = format!("refs/tags/{tag}");
        state.refs.entry(repository_id.to_string()).or_default().insert(
            name.clone(),
            GitRef {
                name,
                object_id: tag_object_id.clone(),
                peeled_object_id: Some(commit_id.to_string()),
            },
        );
        tag_object_id
    }

    /// Point a ref at a commit, as an outside push would.
    pub fn set_ref(&self, repository_id: &str, ref_name: &str, commit_id: &str) {
        self.state().set_ref(repository_id, ref_name, commit_id);
    }

    /// Remove a ref, as an outside actor would.
    pub fn remove_ref(&self, repository_id: &str, ref_name: &str) {
        if let Some(refs) = self.state().refs.get_mut(repository_id) {
            refs.remove(ref_name);
        }
    }

    /// Remove a repository, as an outside actor would.
    pub fn remove_repository(&self, repository_id: &str) {
        let mut state = self.state();
        state.repositories.remove(repository_id);
        state.refs.remove(repository_id);
        state.commits.remove(repository_id);
    }

    /// Current target of a ref.
    #[must_use]
    pub fn ref_target(&self, repository_id: &str, ref_name: &str) -> Option<String> {
        self.state().current_target(repository_id, ref_name)
    }

    /// Number of projects in the organization.
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.state().projects.len()
    }

    /// Number of repositories in the organization.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        self.state().repositories.len()
    }

    /// Number of calls made to a backend method.
    #[must_use]
    pub fn calls(&self, method: &str) -> usize {
        self.state().calls.get(method).copied().unwrap_or(0)
    }

    /// Make queued operations report `inProgress` for `polls` reads first.
    pub fn set_operation_polls(&self, polls: u32) {
        self.state().operation_polls = polls;
    }

    /// Fail the next `times` calls to `method` with `status`, before they run.
    pub fn fail_next(&self, method: &'static str, times: u32, status: u16) {
        self.script(method, FailurePoint::Before, times, status);
    }

    /// Let the next `times` calls to `method` take effect, then fail with
    /// `status` as if the response was lost.
    pub fn fail_after_apply(&self, method: &'static str, times: u32, status: u16) {
        self.script(method, FailurePoint::After, times, status);
    }

    fn script(&self, method: &'static str, point: FailurePoint, times: u32, status: u16) {
        self.state().failures.push(ScriptedFailure {
            method,
            point,
            remaining: times,
            status,
        });
    }
}

fn injected(method: &str, status: u16) -> Error {
    Error::api(status, format!("injected failure in {method}"))
}

impl Backend for MockBackend {
    fn organization(&self) -> Result<Organization> {
        let mut state = self.begin("organization")?;
        let result = Ok(state.organization.clone());
        Self::finish(&mut state, "organization", result)
    }

    fn get_project(&self, id_or_name: &str) -> Result<Option<Project>> {
        let mut state = self.begin("get_project")?;
        let result = Ok(state.find_project(id_or_name).cloned());
        Self::finish(&mut state, "get_project", result)
    }

    fn list_processes(&self) -> Result<Vec<Process>> {
        let mut state = self.begin("list_processes")?;
        let result = Ok(state.processes.clone());
        Self::finish(&mut state, "list_processes", result)
    }

    fn queue_create_project(&self, project: &NewProject) -> Result<Operation> {
        let mut state = self.begin("queue_create_project")?;
        let result = if state.find_project(&project.name).is_some() {
            Err(Error::Api {
                status: 409,
                type_key: Some("ProjectAlreadyExistsException".to_string()),
                message: format!("TF200019: The following project already exists: {}", project.name),
            })
        } else if let Some(process) = state
            .processes
            .iter()
            .find(|p| p.id == project.process_template_id)
            .cloned()
        {
            let created = Project {
                id: state.new_guid(),
                name: project.name.clone(),
                description: project.description.clone(),
                visibility: project.visibility,
                version_control: project.version_control,
                work_item_template: process.name,
                process_template_id: process.id,
            };
            state.projects.insert(created.id.clone(), created);
            Ok(state.queue_operation())
        } else {
            Err(Error::api(
                400,
                format!("process {} does not exist", project.process_template_id),
            ))
        };
        Self::finish(&mut state, "queue_create_project", result)
    }

    fn queue_update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Operation> {
        let mut state = self.begin("queue_update_project")?;
        let result = match state.projects.get_mut(id) {
            Some(project) => {
                if let Some(name) = &patch.name {
                    project.name.clone_from(name);
                }
                if let Some(description) = &patch.description {
                    project.description.clone_from(description);
                }
                if let Some(visibility) = patch.visibility {
                    project.visibility = visibility;
                }
                Ok(state.queue_operation())
            }
            None => Err(project_not_found(id)),
        };
        Self::finish(&mut state, "queue_update_project", result)
    }

    fn queue_delete_project(&self, id: &str) -> Result<Operation> {
        let mut state = self.begin("queue_delete_project")?;
        let result = if state.projects.remove(id).is_some() {
            let repositories: Vec<String> = state
                .repositories
                .values()
                .filter(|r| r.project_id == id)
                .map(|r| r.id.clone())
                .collect();
            for repository_id in repositories {
                state.repositories.remove(&repository_id);
                state.refs.remove(&repository_id);
                state.commits.remove(&repository_id);
            }
            Ok(state.queue_operation())
        } else {
            Err(project_not_found(id))
        };
        Self::finish(&mut state, "queue_delete_project", result)
    }

    fn get_operation(&self, id: &str) -> Result<Operation> {
        let mut state = self.begin("get_operation")?;
        let result = match state.operations.get_mut(id) {
            Some((operation, polls_left)) => {
                if *polls_left > 0 {
                    *polls_left -= 1;
                    operation.status = OperationStatus::InProgress;
                } else {
                    operation.status = OperationStatus::Succeeded;
                }
                Ok(operation.clone())
            }
            None => Err(Error::api(404, format!("operation {id} does not exist"))),
        };
        Self::finish(&mut state, "get_operation", result)
    }

    fn get_repository(&self, id: &str) -> Result<Option<GitRepository>> {
        let mut state = self.begin("get_repository")?;
        let result = Ok(state.repositories.get(id).cloned());
        Self::finish(&mut state, "get_repository", result)
    }

    fn create_repository(&self, repository: &NewRepository) -> Result<GitRepository> {
        let mut state = self.begin("create_repository")?;
        let result = if !state.projects.contains_key(&repository.project_id) {
            Err(project_not_found(&repository.project_id))
        } else if state
            .repositories
            .values()
            .any(|r| r.project_id == repository.project_id && r.name.eq_ignore_ascii_case(&repository.name))
        {
            Err(Error::Api {
                status: 409,
                type_key: Some("GitRepositoryNameAlreadyExistsException".to_string()),
                message: format!(
                    "TF400948: A Git repository with the name {} already exists.",
                    repository.name
                ),
            })
        } else {
            let id = state.new_guid();
            let created = GitRepository {
                url: format!("https://dev.azure.com/contoso/_apis/git/repositories/{id}"),
                remote_url: format!(
                    "https://contoso@dev.azure.com/contoso/{}/_git/{}",
                    repository.project_id, repository.name
                ),
                id,
                project_id: repository.project_id.clone(),
                name: repository.name.clone(),
                default_branch: None,
                size: 0,
                initialization: InitType::Uninitialized,
            };
            state.repositories.insert(created.id.clone(), created.clone());
            Ok(created)
        };
        Self::finish(&mut state, "create_repository", result)
    }

    fn update_repository(&self, id: &str, patch: &RepositoryPatch) -> Result<GitRepository> {
        let mut state = self.begin("update_repository")?;
        let result = match state.repositories.get_mut(id) {
            Some(repository) => {
                if let Some(name) = &patch.name {
                    repository.name.clone_from(name);
                }
                if let Some(branch) = &patch.default_branch {
                    repository.default_branch = Some(branch.clone());
                }
                Ok(repository.clone())
            }
            None => Err(repository_not_found(id)),
        };
        Self::finish(&mut state, "update_repository", result)
    }

    fn delete_repository(&self, id: &str) -> Result<()> {
        let mut state = self.begin("delete_repository")?;
        let result = if state.repositories.remove(id).is_some() {
            state.refs.remove(id);
            state.commits.remove(id);
            Ok(())
        } else {
            Err(repository_not_found(id))
        };
        Self::finish(&mut state, "delete_repository", result)
    }

    fn push(&self, repository_id: &str, push: &Push) -> Result<PushResult> {
        let mut state = self.begin("push")?;
        let result = state.require_repository(repository_id).and_then(|()| {
            let current = state.current_target(repository_id, &push.ref_name);
            if current.as_deref().unwrap_or(ZERO_OBJECT_ID) != push.old_object_id {
                return Err(Error::Api {
                    status: 409,
                    type_key: Some("GitReferenceStaleException".to_string()),
                    message: format!("TF401028: The reference '{}' has already been updated", push.ref_name),
                });
            }
            let commit_id = state.add_commit(repository_id, &push.comment);
            state.set_ref(repository_id, &push.ref_name, &commit_id);
            let push_id = state.next_id();
            let added: u64 = push.changes.iter().map(|c| c.content.len() as u64).sum();
            if let Some(repository) = state.repositories.get_mut(repository_id) {
                if repository.default_branch.is_none() {
                    repository.default_branch = Some(push.ref_name.clone());
                }
                repository.size += added;
            }
            Ok(PushResult { push_id, commit_id })
        });
        Self::finish(&mut state, "push", result)
    }

    fn list_refs(&self, repository_id: &str, filter: &str) -> Result<Vec<GitRef>> {
        let mut state = self.begin("list_refs")?;
        let result = state.require_repository(repository_id).map(|()| {
            state
                .refs
                .get(repository_id)
                .map(|refs| {
                    refs.values()
                        .filter(|r| {
                            r.name
                                .strip_prefix("refs/")
                                .is_some_and(|short| short.starts_with(filter))
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        });
        Self::finish(&mut state, "list_refs", result)
    }

    fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<Option<Commit>> {
        let mut state = self.begin("get_commit")?;
        let result = state.require_repository(repository_id).map(|()| {
            state
                .commits
                .get(repository_id)
                .and_then(|commits| commits.get(commit_id))
                .cloned()
        });
        Self::finish(&mut state, "get_commit", result)
    }

    fn update_refs(
        &self,
        repository_id: &str,
        updates: &[RefUpdate],
    ) -> Result<Vec<RefUpdateResult>> {
        let mut state = self.begin("update_refs")?;
        let result = state.require_repository(repository_id).map(|()| {
            updates
                .iter()
                .map(|update| state.apply_ref_update(repository_id, update))
                .collect()
        });
        Self::finish(&mut state, "update_refs", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(mock: &MockBackend) -> String {
        let project = mock.seed_project("demo");
        mock.seed_repository(&project.id, "app").id
    }

    #[test]
    fn test_list_refs_is_prefix_filtered() {
        let mock = MockBackend::new();
        let repo = repo(&mock);
        mock.seed_commit(&repo, "refs/tags/v1", "one");
        mock.seed_commit(&repo, "refs/tags/v10", "ten");
        mock.seed_commit(&repo, "refs/heads/v1", "branch");

        let refs = mock.list_refs(&repo, "tags/v1").unwrap();
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["refs/tags/v1", "refs/tags/v10"]);
    }

    #[test]
    fn test_list_refs_unknown_repository() {
        let mock = MockBackend::new();
        let err = mock.list_refs("missing", "heads/").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_refs_create_requires_absent_ref() {
        let mock = MockBackend::new();
        let repo = repo(&mock);
        let commit = mock.seed_commit(&repo, "refs/heads/master", "initial");

        let results = mock
            .update_refs(&repo, &[RefUpdate::create("refs/heads/master", &commit)])
            .unwrap();
        assert_eq!(results[0].update_status, RefUpdateStatus::StaleOldObjectId);

        let results = mock
            .update_refs(&repo, &[RefUpdate::create("refs/heads/dev", &commit)])
            .unwrap();
        assert!(results[0].success);
        assert_eq!(mock.ref_target(&repo, "refs/heads/dev"), Some(commit));
    }

    #[test]
    fn test_update_refs_rejects_unknown_commit_and_bad_name() {
        let mock = MockBackend::new();
        let repo = repo(&mock);

        let results = mock
            .update_refs(
                &repo,
                &[
                    RefUpdate::create("refs/heads/dev", "deadbeef"),
                    RefUpdate::create("refs/heads/bad..name", "deadbeef"),
                ],
            )
            .unwrap();
        assert_eq!(results[0].update_status, RefUpdateStatus::UnresolvableToCommit);
        assert_eq!(results[1].update_status, RefUpdateStatus::InvalidRefName);
    }

    #[test]
    fn test_update_refs_delete() {
        let mock = MockBackend::new();
        let repo = repo(&mock);
        let commit = mock.seed_commit(&repo, "refs/heads/dev", "c");

        let results = mock
            .update_refs(&repo, &[RefUpdate::delete("refs/heads/dev", &commit)])
            .unwrap();
        assert!(results[0].success);
        assert_eq!(mock.ref_target(&repo, "refs/heads/dev"), None);
    }

    #[test]
    fn test_push_sets_ref_and_default_branch() {
        let mock = MockBackend::new();
        let repo = repo(&mock);

        let result = mock
            .push(
                &repo,
                &Push {
                    ref_name: "refs/heads/master".to_string(),
                    old_object_id: ZERO_OBJECT_ID.to_string(),
                    comment: "Initial commit.".to_string(),
                    changes: vec![],
                },
            )
            .unwrap();

        assert_eq!(
            mock.ref_target(&repo, "refs/heads/master"),
            Some(result.commit_id)
        );
        let repository = mock.get_repository(&repo).unwrap().unwrap();
        assert_eq!(repository.default_branch.as_deref(), Some("refs/heads/master"));
    }

    #[test]
    fn test_scripted_failures() {
        let mock = MockBackend::new();
        mock.fail_next("organization", 1, 503);

        assert!(mock.organization().unwrap_err().is_retryable());
        assert!(mock.organization().is_ok());
        assert_eq!(mock.calls("organization"), 2);
    }

    #[test]
    fn test_fail_after_apply_keeps_effect() {
        let mock = MockBackend::new();
        let repo = repo(&mock);
        let commit = mock.seed_dangling_commit(&repo, "c");
        mock.fail_after_apply("update_refs", 1, 502);

        let err = mock
            .update_refs(&repo, &[RefUpdate::create("refs/heads/dev", &commit)])
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(mock.ref_target(&repo, "refs/heads/dev"), Some(commit));
    }

    #[test]
    fn test_operations_complete_after_polls() {
        let mock = MockBackend::new();
        mock.set_operation_polls(1);
        let op = mock
            .queue_create_project(&NewProject {
                name: "p".to_string(),
                description: String::new(),
                visibility: Visibility::Private,
                version_control: VersionControl::Git,
                process_template_id: "adcc42ab-9882-485e-a3ed-7678f01f66bc".to_string(),
            })
            .unwrap();

        assert_eq!(mock.get_operation(&op.id).unwrap().status, OperationStatus::InProgress);
        assert_eq!(mock.get_operation(&op.id).unwrap().status, OperationStatus::Succeeded);
    }

    #[test]
    fn test_annotated_tag_is_peeled() {
        let mock = MockBackend::new();
        let repo = repo(&mock);
        let commit = mock.seed_commit(&repo, "refs/heads/master", "c");
        let tag_object = mock.seed_annotated_tag(&repo, "v1.0", &commit);

        let refs = mock.list_refs(&repo, "tags/v1.0").unwrap();
        assert_eq!(refs[0].object_id, tag_object);
        assert_eq!(refs[0].commit_id(), commit);
    }
}
