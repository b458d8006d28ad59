use anyhow::{Context as _, Result, anyhow};

use azdokit::{Branch, BranchSpec, Client, RefSpec, ResolvedRef};
use reconcile::{Applied, OperationContext, Reconciler, apply_update};

use crate::Context;
use crate::cli::{BranchArgs, BranchCommand, CurrentRefArgs, RefArgs};
use crate::ui;

pub fn run(ctx: &Context, cmd: BranchCommand) -> Result<()> {
    let client = super::client(ctx)?;
    let op = super::operation(ctx);

    match cmd {
        BranchCommand::Create(args) => {
            let branch = create(&client, &op, &args)?;
            super::emit(ctx, &branch, |b| {
                ui::success(&format!(
                    "Created branch {} at {}",
                    b.name,
                    ui::short_sha(&b.last_commit_id)
                ));
                print_branch(b);
            })
        }
        BranchCommand::Show { id } => {
            let branch = show(&client, &op, &id)?;
            super::emit(ctx, &branch, |b| {
                ui::header(&b.name);
                print_branch(b);
            })
        }
        BranchCommand::Update { id, args, current } => {
            let applied = update(&client, &op, &id, &args, &current)?;
            super::report_applied(ctx, "branch", &applied, print_branch)
        }
        BranchCommand::Delete(args) => {
            if !super::confirm(&format!("Delete branch {}?", args.id), args.yes)? {
                ui::info("Aborted. No changes made.");
                return Ok(());
            }
            client
                .branches()
                .delete(&op, &args.id)
                .with_context(|| format!("Failed to delete branch {}", args.id))?;
            if !ctx.quiet {
                ui::success(&format!("Deleted branch {}", args.id));
            }
            Ok(())
        }
        BranchCommand::Resolve {
            repository_id,
            source,
        } => {
            let resolved = resolve(&client, &op, &repository_id, &source)?;
            super::emit(ctx, &resolved, |r| {
                ui::kv("source", &r.source.to_string());
                ui::kv("ref", &r.requested);
                ui::kv("commit", &r.commit_id);
            })
        }
    }
}

fn ref_spec(source: &RefArgs) -> RefSpec {
    RefSpec {
        branch: source.branch.clone(),
        commit_id: source.commit_id.clone(),
        tag: source.tag.clone(),
    }
}

fn spec(args: &BranchArgs) -> BranchSpec {
    BranchSpec {
        repository_id: args.repository_id.clone(),
        name: args.name.clone(),
        ref_branch: args.source.branch.clone(),
        ref_commit_id: args.source.commit_id.clone(),
        ref_tag: args.source.tag.clone(),
    }
}

fn create(client: &Client, op: &OperationContext, args: &BranchArgs) -> Result<Branch> {
    client
        .branches()
        .create(op, &spec(args))
        .with_context(|| format!("Failed to create branch {}", args.name))
}

fn show(client: &Client, op: &OperationContext, id: &str) -> Result<Branch> {
    client
        .branches()
        .read(op, id)?
        .ok_or_else(|| anyhow!("Branch {id} not found"))
}

/// Fill in the ref inputs a freshly read branch cannot report.
///
/// Without a recorded source the desired one is assumed, so only an explicit
/// `--current-ref-*` that differs from the desired source moves the branch.
fn recorded(mut branch: Branch, desired: &BranchSpec, current: &CurrentRefArgs) -> Branch {
    if current.is_empty() {
        branch.ref_branch.clone_from(&desired.ref_branch);
        branch.ref_commit_id.clone_from(&desired.ref_commit_id);
        branch.ref_tag.clone_from(&desired.ref_tag);
    } else {
        branch.ref_branch.clone_from(&current.branch);
        branch.ref_commit_id.clone_from(&current.commit_id);
        branch.ref_tag.clone_from(&current.tag);
    }
    branch
}

fn update(
    client: &Client,
    op: &OperationContext,
    id: &str,
    args: &BranchArgs,
    current: &CurrentRefArgs,
) -> Result<Applied<Branch>> {
    let desired = spec(args);
    let existing = recorded(show(client, op, id)?, &desired, current);
    let branches = client.branches();
    log::debug!("Updating branch {id} with the {} strategy", branches.strategy());
    apply_update(&branches, op, &existing, &desired)
        .with_context(|| format!("Failed to update branch {id}"))
}

fn resolve(
    client: &Client,
    op: &OperationContext,
    repository_id: &str,
    source: &RefArgs,
) -> Result<ResolvedRef> {
    Ok(client
        .ref_resolver()
        .resolve(op, repository_id, &ref_spec(source))?)
}

fn print_branch(branch: &Branch) {
    ui::kv("id", &branch.id);
    ui::kv("repository", &branch.repository_id);
    ui::kv("name", &branch.name);
    ui::kv("last commit", &branch.last_commit_id);
}
