use anyhow::{Context as _, Result, anyhow};

use azdokit::{Client, GitRepository, RepositorySpec};
use reconcile::{Applied, OperationContext, Reconciler, apply_update};

use crate::Context;
use crate::cli::{RepoArgs, RepoCommand};
use crate::ui;

pub fn run(ctx: &Context, cmd: RepoCommand) -> Result<()> {
    let client = super::client(ctx)?;
    let op = super::operation(ctx);

    match cmd {
        RepoCommand::Create(args) => {
            let repo = create(&client, &op, &args)?;
            super::emit(ctx, &repo, |r| {
                ui::success(&format!("Created repository {}", r.name));
                print_repository(r);
            })
        }
        RepoCommand::Show { id } => {
            let repo = show(&client, &op, &id)?;
            super::emit(ctx, &repo, |r| {
                ui::header(&r.name);
                print_repository(r);
            })
        }
        RepoCommand::Update { id, args } => {
            let applied = update(&client, &op, &id, &args)?;
            super::report_applied(ctx, "repository", &applied, print_repository)
        }
        RepoCommand::Delete(args) => {
            if !super::confirm(&format!("Delete repository {}?", args.id), args.yes)? {
                ui::info("Aborted. No changes made.");
                return Ok(());
            }
            client
                .repositories()
                .delete(&op, &args.id)
                .with_context(|| format!("Failed to delete repository {}", args.id))?;
            if !ctx.quiet {
                ui::success(&format!("Deleted repository {}", args.id));
            }
            Ok(())
        }
    }
}

fn spec(args: &RepoArgs) -> RepositorySpec {
    let mut spec = RepositorySpec::new(&args.project_id, &args.name).initialization(args.init.into());
    if let Some(branch) = &args.default_branch {
        spec = spec.default_branch(branch);
    }
    spec
}

fn create(client: &Client, op: &OperationContext, args: &RepoArgs) -> Result<GitRepository> {
    client
        .repositories()
        .create(op, &spec(args))
        .with_context(|| format!("Failed to create repository {}", args.name))
}

fn show(client: &Client, op: &OperationContext, id: &str) -> Result<GitRepository> {
    client
        .repositories()
        .read(op, id)?
        .ok_or_else(|| anyhow!("Repository {id} not found"))
}

fn update(
    client: &Client,
    op: &OperationContext,
    id: &str,
    args: &RepoArgs,
) -> Result<Applied<GitRepository>> {
    let current = show(client, op, id)?;
    apply_update(&client.repositories(), op, &current, &spec(args))
        .with_context(|| format!("Failed to update repository {id}"))
}

/// Default branch without its `refs/heads/` prefix
fn default_branch(repo: &GitRepository) -> Option<&str> {
    repo.default_branch
        .as_deref()
        .map(azdokit::refs::short_branch_name)
}

fn print_repository(repo: &GitRepository) {
    ui::kv("id", &repo.id);
    ui::kv("name", &repo.name);
    ui::kv("project", &repo.project_id);
    ui::kv_opt("default branch", default_branch(repo));
    ui::kv("clone url", &repo.remote_url);
    ui::kv("size", &ui::format_size(repo.size));
}
