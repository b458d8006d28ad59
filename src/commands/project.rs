use anyhow::{Context as _, Result, anyhow};

use azdokit::{Client, Project, ProjectSpec};
use reconcile::{Applied, OperationContext, Reconciler, apply_update};

use crate::Context;
use crate::cli::{ProjectArgs, ProjectCommand};
use crate::ui;

pub fn run(ctx: &Context, cmd: ProjectCommand) -> Result<()> {
    let client = super::client(ctx)?;
    let op = super::operation(ctx);

    match cmd {
        ProjectCommand::Create(args) => {
            let project = create(&client, &op, &args)?;
            super::emit(ctx, &project, |p| {
                ui::success(&format!("Created project {}", p.name));
                print_project(p);
            })
        }
        ProjectCommand::Show { id } => {
            let project = show(&client, &op, &id)?;
            super::emit(ctx, &project, |p| {
                ui::header(&p.name);
                print_project(p);
            })
        }
        ProjectCommand::Update { id, args } => {
            let applied = update(&client, &op, &id, &args)?;
            super::report_applied(ctx, "project", &applied, print_project)
        }
        ProjectCommand::Delete(args) => {
            if !super::confirm(&format!("Delete project {} and everything in it?", args.id), args.yes)? {
                ui::info("Aborted. No changes made.");
                return Ok(());
            }
            delete(&client, &op, &args.id)?;
            if !ctx.quiet {
                ui::success(&format!("Deleted project {}", args.id));
            }
            Ok(())
        }
    }
}

fn spec(args: &ProjectArgs) -> ProjectSpec {
    let mut spec = ProjectSpec::new(&args.name)
        .visibility(args.visibility.into())
        .version_control(args.version_control.into())
        .work_item_template(&args.work_item_template);
    if let Some(description) = &args.description {
        spec = spec.description(description);
    }
    spec
}

fn create(client: &Client, op: &OperationContext, args: &ProjectArgs) -> Result<Project> {
    client
        .projects()
        .create(op, &spec(args))
        .with_context(|| format!("Failed to create project {}", args.name))
}

fn show(client: &Client, op: &OperationContext, id: &str) -> Result<Project> {
    client
        .projects()
        .read(op, id)?
        .ok_or_else(|| anyhow!("Project {id} not found"))
}

fn update(
    client: &Client,
    op: &OperationContext,
    id: &str,
    args: &ProjectArgs,
) -> Result<Applied<Project>> {
    let current = show(client, op, id)?;
    apply_update(&client.projects(), op, &current, &spec(args))
        .with_context(|| format!("Failed to update project {id}"))
}

fn delete(client: &Client, op: &OperationContext, id: &str) -> Result<()> {
    client
        .projects()
        .delete(op, id)
        .with_context(|| format!("Failed to delete project {id}"))
}

fn print_project(project: &Project) {
    ui::kv("id", &project.id);
    ui::kv("name", &project.name);
    if !project.description.is_empty() {
        ui::kv("description", &project.description);
    }
    ui::kv("visibility", project.visibility.as_str());
    ui::kv("version control", project.version_control.as_str());
    ui::kv("work item template", &project.work_item_template);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{VersionControlArg, VisibilityArg};
    use azdokit::{MockBackend, ProviderConfig, RetryConfig, Visibility};
    use std::sync::Arc;
    use std::time::Duration;

    fn client(mock: &MockBackend) -> Client {
        let config = ProviderConfig::new("https://dev.azure.com/contoso", "pat")
            .with_retry(RetryConfig::no_retry())
            .with_poll_interval(Duration::from_millis(1));
        Client::with_backend(config, Arc::new(mock.clone()))
    }

    fn args(name: &str) -> ProjectArgs {
        ProjectArgs {
            name: name.to_string(),
            description: None,
            visibility: VisibilityArg::Private,
            version_control: VersionControlArg::Git,
            work_item_template: "Agile".to_string(),
        }
    }

    #[test]
    fn test_create_show_update_delete() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let op = OperationContext::new();

        let project = create(&client, &op, &args("demo")).unwrap();
        assert_eq!(show(&client, &op, &project.id).unwrap().name, "demo");

        let mut changed = args("demo");
        changed.visibility = VisibilityArg::Public;
        let applied = update(&client, &op, &project.id, &changed).unwrap();
        assert_eq!(applied.action(), "updated");
        assert_eq!(applied.entity().visibility, Visibility::Public);

        delete(&client, &op, &project.id).unwrap();
        assert!(show(&client, &op, &project.id).is_err());
    }

    #[test]
    fn test_update_missing_project() {
        let mock = MockBackend::new();
        let err = update(&client(&mock), &OperationContext::new(), "nope", &args("x")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
