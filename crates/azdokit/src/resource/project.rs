//! Project reconciler.
//!
//! Project creation, change and deletion are queued by the service; each
//! call returns an operation that is polled until it reaches a final state.

use crate::error::{Error, Result};
use crate::remote::Remote;
use crate::types::{
    NewProject, Operation, OperationStatus, Process, Project, ProjectPatch, ProjectSpec,
};
use reconcile::{OperationContext, Reconciler, UpdateOutcome};
use std::time::Duration;

/// Reconciler for `project`.
#[derive(Clone)]
pub struct ProjectReconciler {
    remote: Remote,
    poll_interval: Duration,
}

impl ProjectReconciler {
    pub(crate) fn new(remote: Remote, poll_interval: Duration) -> Self {
        Self {
            remote,
            poll_interval,
        }
    }

    /// Poll a queued operation until it finishes.
    fn wait(&self, ctx: &OperationContext, mut operation: Operation) -> Result<()> {
        while !operation.status.is_terminal() {
            log::debug!("Operation {} is {}", operation.id, operation.status);
            ctx.sleep(self.poll_interval)?;
            let what = format!("get operation {}", operation.id);
            operation = self
                .remote
                .read(ctx, &what, |b| b.get_operation(&operation.id))?;
        }

        if operation.status == OperationStatus::Succeeded {
            return Ok(());
        }
        Err(Error::OperationFailed {
            message: operation
                .result_message
                .unwrap_or_else(|| "no details reported".to_string()),
            status: operation.status.to_string(),
            id: operation.id,
        })
    }

    /// Validate `desired` and find the process it names.
    fn process_for(&self, ctx: &OperationContext, desired: &ProjectSpec) -> Result<Process> {
        if desired.name.trim().is_empty() {
            return Err(Error::invalid_input("project name is required"));
        }

        let processes = self
            .remote
            .read(ctx, "list processes", |b| b.list_processes())?;
        processes
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(&desired.work_item_template))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unknown work item template '{}'",
                    desired.work_item_template
                ))
            })
    }

    fn get(&self, ctx: &OperationContext, id_or_name: &str) -> Result<Option<Project>> {
        let what = format!("get project {id_or_name}");
        self.remote.read(ctx, &what, |b| b.get_project(id_or_name))
    }
}

impl Reconciler for ProjectReconciler {
    type Desired = ProjectSpec;
    type Entity = Project;
    type Error = Error;

    fn resource_type(&self) -> &'static str {
        "project"
    }

    fn create(&self, ctx: &OperationContext, desired: &ProjectSpec) -> Result<Project> {
        let process = self.process_for(ctx, desired)?;

        let request = NewProject {
            name: desired.name.clone(),
            description: desired.description.clone().unwrap_or_default(),
            visibility: desired.visibility,
            version_control: desired.version_control,
            process_template_id: process.id,
        };
        let what = format!("create project {}", desired.name);
        let operation = self
            .remote
            .write(ctx, &what, |b| b.queue_create_project(&request))?;
        self.wait(ctx, operation)?;

        let project = self.get(ctx, &desired.name)?.ok_or_else(|| {
            Error::InvalidResponse(format!("project {} missing after creation", desired.name))
        })?;
        log::info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    fn read(&self, ctx: &OperationContext, id: &str) -> Result<Option<Project>> {
        self.get(ctx, id)
    }

    fn update(
        &self,
        ctx: &OperationContext,
        current: &Project,
        desired: &ProjectSpec,
    ) -> Result<UpdateOutcome<Project>> {
        let mut replace = Vec::new();
        if desired.version_control != current.version_control {
            replace.push("version_control");
        }
        if !desired
            .work_item_template
            .eq_ignore_ascii_case(&current.work_item_template)
        {
            replace.push("work_item_template");
        }
        if !replace.is_empty() {
            return Ok(UpdateOutcome::RequiresReplace { fields: replace });
        }

        let description = desired.description.clone().unwrap_or_default();
        let patch = ProjectPatch {
            name: (desired.name != current.name).then(|| desired.name.clone()),
            description: (description != current.description).then_some(description),
            visibility: (desired.visibility != current.visibility).then_some(desired.visibility),
        };

        if !patch.is_empty() {
            let what = format!("update project {}", current.id);
            let operation = self
                .remote
                .write(ctx, &what, |b| b.queue_update_project(&current.id, &patch))?;
            self.wait(ctx, operation)?;
            log::info!("Updated project {}", current.id);
        }

        self.get(ctx, &current.id)?
            .map(UpdateOutcome::Updated)
            .ok_or_else(|| Error::not_found("project", &current.id))
    }

    fn preflight(&self, ctx: &OperationContext, desired: &ProjectSpec) -> Result<()> {
        self.process_for(ctx, desired).map(|_| ())
    }

    fn delete(&self, ctx: &OperationContext, id: &str) -> Result<()> {
        if self.get(ctx, id)?.is_none() {
            return Ok(());
        }

        let what = format!("delete project {id}");
        let operation = match self.remote.write(ctx, &what, |b| b.queue_delete_project(id)) {
            Ok(operation) => operation,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        self.wait(ctx, operation)?;
        log::info!("Deleted project {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::ErrorCategory;
    use crate::types::{RetryConfig, VersionControl, Visibility};
    use reconcile::{Entity, apply_update};
    use std::sync::Arc;

    fn reconciler() -> (MockBackend, ProjectReconciler) {
        let mock = MockBackend::new();
        let remote = Remote::new(Arc::new(mock.clone()), RetryConfig::no_retry());
        (mock, ProjectReconciler::new(remote, Duration::from_millis(1)))
    }

    #[test]
    fn test_create_waits_for_operation() {
        let (mock, projects) = reconciler();
        mock.set_operation_polls(2);
        let ctx = OperationContext::new();

        let project = projects
            .create(&ctx, &ProjectSpec::new("demo").description("Demo project"))
            .unwrap();

        assert_eq!(project.name, "demo");
        assert_eq!(project.description, "Demo project");
        assert_eq!(project.work_item_template, "Agile");
        assert_eq!(mock.calls("get_operation"), 3);
    }

    #[test]
    fn test_create_unknown_template() {
        let (mock, projects) = reconciler();
        let err = projects
            .create(
                &OperationContext::new(),
                &ProjectSpec::new("demo").work_item_template("Waterfall"),
            )
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Fatal);
        assert_eq!(mock.calls("queue_create_project"), 0);
    }

    #[test]
    fn test_create_duplicate_conflicts() {
        let (mock, projects) = reconciler();
        mock.seed_project("demo");

        let err = projects
            .create(&OperationContext::new(), &ProjectSpec::new("demo"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_update_in_place() {
        let (_mock, projects) = reconciler();
        let ctx = OperationContext::new();
        let current = projects.create(&ctx, &ProjectSpec::new("demo")).unwrap();

        let desired = ProjectSpec::new("demo-renamed")
            .description("now public")
            .visibility(Visibility::Public);
        let updated = projects
            .update(&ctx, &current, &desired)
            .unwrap()
            .into_entity()
            .unwrap();

        assert_eq!(updated.id, current.id);
        assert_eq!(updated.name, "demo-renamed");
        assert_eq!(updated.visibility, Visibility::Public);
    }

    #[test]
    fn test_version_control_change_replaces() {
        let (mock, projects) = reconciler();
        let ctx = OperationContext::new();
        let current = projects.create(&ctx, &ProjectSpec::new("demo")).unwrap();

        let desired = ProjectSpec::new("demo").version_control(VersionControl::Tfvc);
        let applied = apply_update(&projects, &ctx, &current, &desired).unwrap();

        assert_eq!(applied.action(), "replaced");
        assert_ne!(applied.entity().id(), current.id);
        assert_eq!(applied.entity().version_control, VersionControl::Tfvc);
        assert_eq!(mock.project_count(), 1);
    }

    #[test]
    fn test_template_change_to_unknown_process_keeps_project() {
        let (mock, projects) = reconciler();
        let ctx = OperationContext::new();
        let current = projects.create(&ctx, &ProjectSpec::new("demo")).unwrap();

        let desired = ProjectSpec::new("demo").work_item_template("Waterfall");
        let err = apply_update(&projects, &ctx, &current, &desired).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Fatal);
        assert_eq!(mock.calls("queue_delete_project"), 0);
        assert!(projects.read(&ctx, &current.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mock, projects) = reconciler();
        let ctx = OperationContext::new();
        let project = projects.create(&ctx, &ProjectSpec::new("demo")).unwrap();

        projects.delete(&ctx, &project.id).unwrap();
        projects.delete(&ctx, &project.id).unwrap();

        assert_eq!(mock.project_count(), 0);
        assert!(projects.read(&ctx, &project.id).unwrap().is_none());
    }

    #[test]
    fn test_cancel_while_polling() {
        let (mock, projects) = reconciler();
        mock.set_operation_polls(u32::MAX);
        let ctx = OperationContext::with_timeout(Duration::from_millis(30));

        let err = projects
            .create(&ctx, &ProjectSpec::new("slow"))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Interrupted);
    }
}
