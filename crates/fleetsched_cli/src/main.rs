//! Operator CLI over the scheduling core.
//!
//! # Responsibility
//! - Seed tasks and drive assignment create/check/unassign against a local
//!   task store.
//! - Print machine-readable JSON so outputs can be piped into other tools.
//!
//! # Invariants
//! - Commands behind the scheduling gate never run without an explicit
//!   identity from `--as` or `FLEETSCHED_ACTOR`.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use fleetsched_core::db::open_db;
use fleetsched_core::{
    core_version, init_logging, report_conflicts, Actor, AssignmentOutcome, AssignmentRequest,
    AssignmentService, AssignmentServiceError, LogSettings, RemovalOutcome, Role,
    SqliteTaskRepository, Task, TaskId, TaskRepository, WorkItem, WorkItemId,
};
use log::{error, info};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

const ACTOR_ENV: &str = "FLEETSCHED_ACTOR";

#[derive(Parser)]
#[command(name = "fleetsched")]
#[command(about = "Assignment scheduling for vehicle-testing tasks", long_about = None)]
struct Cli {
    /// Acting identity as `user:role` (admin, supervisor, tester, viewer)
    #[arg(long = "as", global = true, env = ACTOR_ENV, value_parser = parse_actor)]
    actor: Option<Actor>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core library version
    Version,
    /// Create a task with one work item per title
    Seed {
        db: PathBuf,
        title: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Print one task as stored
    Show { db: PathBuf, task_id: TaskId },
    /// Create an assignment from a JSON request file
    Assign {
        db: PathBuf,
        task_id: TaskId,
        request: PathBuf,
    },
    /// Report the conflicts a JSON request would meet, without writing
    Check {
        db: PathBuf,
        task_id: TaskId,
        request: PathBuf,
    },
    /// Take one work item off its schedule
    Unassign {
        db: PathBuf,
        task_id: TaskId,
        work_item_id: WorkItemId,
    },
    /// Print day to assignment coverage
    Coverage { db: PathBuf, task_id: TaskId },
}

fn main() -> ExitCode {
    if let Some(settings) = LogSettings::from_env() {
        if let Err(err) = init_logging(&settings.level, &settings.log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let actor = cli.actor;
    match cli.command {
        Commands::Version => {
            println!("fleetsched_core version={}", core_version());
            Ok(())
        }
        Commands::Seed { db, title, items } => seed(&db, &title, &items),
        Commands::Show { db, task_id } => with_service(&db, |service| {
            print_json(&service.load_task(task_id)?)
        }),
        Commands::Assign {
            db,
            task_id,
            request,
        } => {
            let actor = require_actor(actor)?;
            let request = read_request(&request)?;
            with_service(&db, |service| {
                match service.create_assignment(&actor, task_id, &request) {
                    Ok(AssignmentOutcome::Committed(receipt)) => print_json(&receipt),
                    Ok(AssignmentOutcome::PendingConfirmation(conflicts)) => print_json(&json!({
                        "requiresConfirmation": true,
                        "conflicts": report_conflicts(&conflicts),
                    })),
                    Err(AssignmentServiceError::BlockingConflict(conflicts)) => {
                        print_json(&json!({
                            "requiresConfirmation": false,
                            "conflicts": report_conflicts(&conflicts),
                        }))?;
                        bail!("assignment blocked by conflicts that cannot be overridden")
                    }
                    Err(err) => Err(err.into()),
                }
            })
        }
        Commands::Check {
            db,
            task_id,
            request,
        } => {
            let actor = require_actor(actor)?;
            let request = read_request(&request)?;
            with_service(&db, |service| {
                let conflicts = service.check_assignment(&actor, task_id, &request)?;
                print_json(&report_conflicts(&conflicts))
            })
        }
        Commands::Unassign {
            db,
            task_id,
            work_item_id,
        } => {
            let actor = require_actor(actor)?;
            with_service(&db, |service| {
                let outcome = service.unassign_work_item(&actor, task_id, work_item_id)?;
                let path = match outcome {
                    RemovalOutcome::Structured(_) => "structured",
                    RemovalOutcome::Legacy(_) => "legacy",
                };
                print_json(&json!({ "path": path, "outcome": format!("{outcome:?}") }))
            })
        }
        Commands::Coverage { db, task_id } => with_service(&db, |service| {
            let days: serde_json::Map<String, serde_json::Value> = service
                .coverage(task_id)?
                .into_iter()
                .map(|(day, ids)| (day.to_string(), json!(ids)))
                .collect();
            print_json(&days)
        }),
    }
}

/// Parses `user:role`.
fn parse_actor(value: &str) -> Result<Actor, String> {
    let (user, role) = value
        .split_once(':')
        .ok_or_else(|| format!("expected user:role, got `{value}`"))?;
    let user = user.trim();
    if user.is_empty() {
        return Err("user must not be empty".to_string());
    }
    let role = Role::parse(role.trim()).map_err(|err| err.to_string())?;
    Ok(Actor::new(user, role))
}

fn require_actor(actor: Option<Actor>) -> Result<Actor> {
    actor.ok_or_else(|| {
        anyhow!("this command needs an identity: pass --as user:role or set {ACTOR_ENV}")
    })
}

fn with_service<F>(db: &Path, body: F) -> Result<()>
where
    F: FnOnce(&AssignmentService<&SqliteTaskRepository<'_>>) -> Result<()>,
{
    let conn = open_db(db).with_context(|| format!("opening {}", db.display()))?;
    let repo = SqliteTaskRepository::try_new(&conn)?;
    let service = AssignmentService::new(&repo);
    body(&service)
}

fn seed(db: &Path, title: &str, item_titles: &[String]) -> Result<()> {
    let conn = open_db(db).with_context(|| format!("opening {}", db.display()))?;
    let repo = SqliteTaskRepository::try_new(&conn)?;
    let work_items = item_titles
        .iter()
        .map(|item_title| WorkItem::new(Uuid::new_v4(), item_title.as_str()))
        .collect();
    let task = Task::new(Uuid::new_v4(), title).with_work_items(work_items);
    repo.create_task(&task)?;
    info!(
        "event=task_seed module=cli status=ok task={} items={}",
        task.id,
        task.work_items.len()
    );
    print_json(&task)
}

fn read_request(path: &Path) -> Result<AssignmentRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing request {}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
