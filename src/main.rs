//! tasktree CLI - hierarchical task tracking with dotted-path ids.

use clap::Parser;
use colored::*;
use eyre::{eyre, Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use tasktree::{
    build_hierarchy, DepKind, MetaOp, NewTask, Priority, Readiness, Status, Store,
    StoreSearchExt, Task, TaskFilters, TaskId, TaskNode, TaskPatch,
};

mod cli;

use cli::{Cli, Command, DepCommand, MetaCommand};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tasktree")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tasktree.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn parse_id(s: &str) -> Result<TaskId> {
    TaskId::parse(s).map_err(|e| eyre!("invalid task id '{}': {}", s, e))
}

fn parse_status(s: &str) -> Result<Status> {
    Status::parse(s).ok_or_else(|| eyre!("unknown status '{}' (todo, in-progress, done)", s))
}

fn parse_readiness(s: &str) -> Result<Readiness> {
    Readiness::parse(s).ok_or_else(|| eyre!("unknown readiness '{}' (draft, ready, blocked)", s))
}

fn parse_priority(s: &str) -> Result<Priority> {
    Priority::parse(s).ok_or_else(|| eyre!("unknown priority '{}' (high, medium, low)", s))
}

fn parse_kind(s: &str) -> Result<DepKind> {
    DepKind::parse(s).ok_or_else(|| eyre!("unknown edge kind '{}' (child, after, sibling)", s))
}

/// Meta values are JSON when they parse as JSON, plain strings otherwise,
/// so `tt meta set 1 build.count 3` stores a number.
fn parse_meta_value(s: &str) -> serde_json::Value {
    serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
}

fn format_status(status: &Status) -> ColoredString {
    match status {
        Status::Todo => "todo".yellow(),
        Status::InProgress => "in-progress".blue(),
        Status::Done => "done".green(),
    }
}

fn format_readiness(readiness: &Readiness) -> ColoredString {
    match readiness {
        Readiness::Draft => "draft".dimmed(),
        Readiness::Ready => "ready".green(),
        Readiness::Blocked => "blocked".red(),
    }
}

fn print_task_line(task: &Task) {
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", task.tags.join(", "))
    };
    println!(
        "{} {} {} {}{}",
        format_status(&task.status),
        task.id.to_string().cyan(),
        task.priority.as_str(),
        task.title,
        tags.dimmed()
    );
}

fn print_tree(nodes: &[TaskNode], depth: usize) {
    for node in nodes {
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            node.task.id.to_string().cyan(),
            format_status(&node.task.status),
            node.task.title
        );
        print_tree(&node.children, depth + 1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Init => {
            Store::init(&store_dir).context("Failed to initialize tasktree store")?;
            println!(
                "{} Initialized tasktree store in {}",
                "✓".green(),
                store_dir.display()
            );
        }

        Command::Add {
            title,
            parent,
            after,
            description,
            priority,
            tags,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let mut new = NewTask::new(title);
            new.description = description;
            new.priority = priority.as_deref().map(parse_priority).transpose()?;
            new.tags = tags.unwrap_or_default();
            new.parent = parent.as_deref().map(parse_id).transpose()?;
            new.after = after.as_deref().map(parse_id).transpose()?;

            let task = store.create(new).context("Failed to create task")?;
            println!(
                "{} Created: {} {}",
                "✓".green(),
                task.id.to_string().cyan(),
                task.title
            );
        }

        Command::List {
            status,
            readiness,
            priority,
            tag,
        } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let filters = TaskFilters {
                status: status.as_deref().map(parse_status).transpose()?,
                readiness: readiness.as_deref().map(parse_readiness).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                tags: tag,
            };

            // An empty query applies the structural filters alone
            let tasks = store.search("", &filters).context("Failed to list tasks")?;

            if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
            } else {
                for task in tasks {
                    print_task_line(&task);
                }
            }
        }

        Command::Show { id } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let id = parse_id(&id)?;

            match store.get(&id).context("Failed to get task")? {
                Some(task) => {
                    println!("{}: {}", "ID".bold(), task.id.to_string().cyan());
                    println!("{}: {}", "Title".bold(), task.title);
                    println!("{}: {}", "Status".bold(), format_status(&task.status));
                    println!("{}: {}", "Readiness".bold(), format_readiness(&task.readiness));
                    println!("{}: {}", "Priority".bold(), task.priority.as_str());
                    if let Some(parent) = &task.parent_id {
                        println!("{}: {}", "Parent".bold(), parent.to_string().cyan());
                    }
                    if !task.tags.is_empty() {
                        println!("{}: {}", "Tags".bold(), task.tags.join(", "));
                    }
                    if let Some(desc) = &task.description {
                        println!("{}: {}", "Description".bold(), desc);
                    }
                    if let Some(body) = &task.body {
                        println!("{}:\n{}", "Body".bold(), body);
                    }
                    if task.metadata.as_object().is_some_and(|m| !m.is_empty()) {
                        println!(
                            "{}: {}",
                            "Metadata".bold(),
                            serde_json::to_string_pretty(&task.metadata)
                                .context("Failed to render metadata")?
                        );
                    }
                    println!("{}: {}", "Created".bold(), task.created_at);
                    println!("{}: {}", "Updated".bold(), task.updated_at);

                    let deps = store
                        .dependencies_of(&task.id)
                        .context("Failed to list dependencies")?;
                    for dep in deps.iter().filter(|d| d.kind != DepKind::Child) {
                        println!(
                            "{}: {} {} {}",
                            "Edge".bold(),
                            dep.from_id.to_string().cyan(),
                            dep.kind.as_str(),
                            dep.to_id.to_string().cyan()
                        );
                    }
                }
                None => {
                    eprintln!("{} Task not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Update {
            id,
            title,
            description,
            status,
            readiness,
            priority,
            tags,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let id = parse_id(&id)?;
            let patch = TaskPatch {
                title,
                description: description.map(Some),
                status: status.as_deref().map(parse_status).transpose()?,
                readiness: readiness.as_deref().map(parse_readiness).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                tags,
                ..Default::default()
            };

            let task = store.update(&id, patch).context("Failed to update task")?;
            println!(
                "{} Updated: {} {}",
                "✓".green(),
                task.id.to_string().cyan(),
                task.title
            );
        }

        Command::Remove { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let id = parse_id(&id)?;

            let task = store.remove(&id).context("Failed to remove task")?;
            println!(
                "{} Removed: {} {} (siblings renumbered)",
                "✓".green(),
                task.id.to_string().cyan(),
                task.title
            );
        }

        Command::Move { id, after, under, root } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let id = parse_id(&id)?;

            let task = if let Some(after) = after {
                let sibling = parse_id(&after)?;
                store
                    .move_after(&id, &sibling)
                    .context("Failed to move task")?
            } else if let Some(under) = under {
                let parent = parse_id(&under)?;
                store
                    .reparent(&id, Some(&parent))
                    .context("Failed to move task")?
            } else if root {
                store.reparent(&id, None).context("Failed to move task")?
            } else {
                return Err(eyre!("move requires one of --after, --under, or --root"));
            };

            println!(
                "{} Moved: {} {} {}",
                "→".blue(),
                id.to_string().cyan(),
                "is now".dimmed(),
                task.id.to_string().cyan()
            );
        }

        Command::Dep { command } => match command {
            DepCommand::Add { from, to, kind } => {
                let mut store = Store::open(&store_dir).context("Failed to open store")?;
                let from = parse_id(&from)?;
                let to = parse_id(&to)?;
                let kind = parse_kind(&kind)?;

                store
                    .add_dependency(&from, &to, kind)
                    .context("Failed to add dependency")?;
                println!(
                    "{} {} {} {}",
                    "✓".green(),
                    from.to_string().cyan(),
                    kind.as_str(),
                    to.to_string().cyan()
                );
            }

            DepCommand::Rm { from, to, kind } => {
                let mut store = Store::open(&store_dir).context("Failed to open store")?;
                let from = parse_id(&from)?;
                let to = parse_id(&to)?;
                let kind = parse_kind(&kind)?;

                store
                    .remove_dependency(&from, &to, kind)
                    .context("Failed to remove dependency")?;
                println!(
                    "{} Removed edge {} {} {}",
                    "✓".green(),
                    from.to_string().cyan(),
                    kind.as_str(),
                    to.to_string().cyan()
                );
            }

            DepCommand::List { id } => {
                let store = Store::open(&store_dir).context("Failed to open store")?;
                let id = parse_id(&id)?;
                let deps = store
                    .dependencies_of(&id)
                    .context("Failed to list dependencies")?;

                if deps.is_empty() {
                    println!("{}", "No edges".dimmed());
                } else {
                    for dep in deps {
                        println!(
                            "{} {} {}",
                            dep.from_id.to_string().cyan(),
                            dep.kind.as_str(),
                            dep.to_id.to_string().cyan()
                        );
                    }
                }
            }
        },

        Command::Meta { command } => match command {
            MetaCommand::Get { id, path } => {
                let store = Store::open(&store_dir).context("Failed to open store")?;
                let id = parse_id(&id)?;

                match store
                    .get_metadata(&id, &path)
                    .context("Failed to read metadata")?
                {
                    Some(value) => println!(
                        "{}",
                        serde_json::to_string_pretty(&value)
                            .context("Failed to render metadata")?
                    ),
                    None => {
                        eprintln!("{} No value at '{}'", "✗".red(), path);
                        std::process::exit(1);
                    }
                }
            }

            MetaCommand::Set { id, path, value } => {
                let mut store = Store::open(&store_dir).context("Failed to open store")?;
                let id = parse_id(&id)?;
                store
                    .update_metadata(&id, &path, Some(parse_meta_value(&value)), MetaOp::Set)
                    .context("Failed to set metadata")?;
                println!("{} Set {} on {}", "✓".green(), path, id.to_string().cyan());
            }

            MetaCommand::Append { id, path, value } => {
                let mut store = Store::open(&store_dir).context("Failed to open store")?;
                let id = parse_id(&id)?;
                store
                    .update_metadata(&id, &path, Some(parse_meta_value(&value)), MetaOp::Append)
                    .context("Failed to append metadata")?;
                println!(
                    "{} Appended to {} on {}",
                    "✓".green(),
                    path,
                    id.to_string().cyan()
                );
            }

            MetaCommand::Remove { id, path } => {
                let mut store = Store::open(&store_dir).context("Failed to open store")?;
                let id = parse_id(&id)?;
                store
                    .update_metadata(&id, &path, None, MetaOp::Remove)
                    .context("Failed to remove metadata")?;
                println!(
                    "{} Removed {} from {}",
                    "✓".green(),
                    path,
                    id.to_string().cyan()
                );
            }
        },

        Command::Search {
            query,
            status,
            readiness,
            priority,
            tag,
        } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let filters = TaskFilters {
                status: status.as_deref().map(parse_status).transpose()?,
                readiness: readiness.as_deref().map(parse_readiness).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                tags: tag,
            };

            let tasks = store.search(&query, &filters).context("Search failed")?;

            if tasks.is_empty() {
                println!("{}", "No matching tasks".dimmed());
            } else {
                println!("{} {} match(es):", "→".blue(), tasks.len());
                for task in tasks {
                    print_task_line(&task);
                }
            }
        }

        Command::Similar { title, threshold } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let hits = store
                .find_similar(&title, threshold)
                .context("Similarity search failed")?;

            if hits.is_empty() {
                println!("{}", "No similar tasks".dimmed());
            } else {
                println!("{} {} similar task(s):", "→".blue(), hits.len());
                for hit in hits {
                    println!(
                        "  {} {:.2} {}",
                        hit.id.to_string().cyan(),
                        hit.score,
                        hit.title
                    );
                }
            }
        }

        Command::Tree => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let tasks = store.list().context("Failed to list tasks")?;

            if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
            } else {
                let roots = build_hierarchy(&tasks);
                print_tree(&roots, 0);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
