//! `Taskdesk` — chat-embedded task board.
//!
//! One-shot CLI over a board session. Connects to a sheet service when one
//! is configured, otherwise runs against a seeded in-memory board (offline
//! demo mode).
//!
//! ```bash
//! # Offline demo mode
//! cargo run --bin taskdesk -- --user-id 2 view
//!
//! # Against a sheet service
//! cargo run --bin taskdesk -- --service-url ws://127.0.0.1:9100/ws \
//!     --user-id 10042 status 4 done
//!
//! # Or via environment variables
//! TASKDESK_SERVICE=ws://127.0.0.1:9100/ws TASKDESK_USER=10042 \
//!     cargo run --bin taskdesk -- view
//! ```

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdesk::config::{CliArgs, ClientConfig};
use taskdesk::notify::LogNotifier;
use taskdesk::project::ProjectedBoard;
use taskdesk::session::Session;
use taskdesk::store::RowStore;
use taskdesk::store::memory::MemStore;
use taskdesk::store::remote::RemoteStore;
use taskdesk_proto::task::{
    RowId, TaskDraft, TaskEdit, TaskKey, TaskStatus, join_responsible, split_responsible,
};

/// Top-level CLI: shared flags plus one subcommand.
#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Board operations.
#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Show the board (default).
    View,
    /// Move a task to a new status.
    Status {
        /// Row number of the task.
        row: u32,
        /// Target status (in_progress, queued, on_hold, done).
        status: TaskStatus,
    },
    /// Reorder one status group; list every row, most urgent first.
    Reorder {
        /// Group to reorder.
        status: TaskStatus,
        /// Full new order of row numbers.
        #[arg(required = true)]
        rows: Vec<u32>,
    },
    /// Create a task.
    Add {
        /// Task name.
        name: String,
        /// Project the task belongs to.
        #[arg(long)]
        project: String,
        /// Initial status.
        #[arg(long, default_value = "queued")]
        status: TaskStatus,
        /// Note for the people responsible.
        #[arg(long)]
        message: Option<String>,
        /// Comma-separated responsible employee names.
        #[arg(long, default_value = "")]
        responsible: String,
    },
    /// Edit a task's name, message, or responsible list.
    Edit {
        /// Row number of the task.
        row: u32,
        /// New task name.
        #[arg(long)]
        name: Option<String>,
        /// New note (empty string clears it).
        #[arg(long)]
        message: Option<String>,
        /// New comma-separated responsible list.
        #[arg(long)]
        responsible: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    let Some(user_id) = config.user_id.clone() else {
        eprintln!("Error: no user id given (use --user-id or TASKDESK_USER)");
        std::process::exit(1);
    };
    let command = cli.command.unwrap_or(Command::View);

    let result = match &config.service_url {
        Some(url) => {
            match RemoteStore::connect_with_timeouts(
                url,
                config.connect_timeout,
                config.request_timeout,
            )
            .await
            {
                Ok(store) => run(store, &user_id, command).await,
                Err(e) => Err(format!("could not connect to {url}: {e}")),
            }
        }
        None => {
            tracing::info!("no service configured, using offline demo board");
            run(MemStore::demo(), &user_id, command).await
        }
    };

    if let Err(message) = result {
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}

/// Opens a session and executes one command against it.
async fn run<S: RowStore>(store: S, user_id: &str, command: Command) -> Result<(), String> {
    let mut session = Session::open(store, LogNotifier, user_id)
        .await
        .map_err(|e| e.to_string())?;

    match command {
        Command::View => {}
        Command::Status { row, status } => {
            let key = TaskKey::Row(RowId::new(row));
            session
                .change_status(&key, status)
                .await
                .map_err(|e| e.to_string())?;
            println!("Task {row} moved to {status}.");
        }
        Command::Reorder { status, rows } => {
            let keys: Vec<TaskKey> = rows
                .iter()
                .map(|&r| TaskKey::Row(RowId::new(r)))
                .collect();
            session
                .reorder(status, &keys)
                .await
                .map_err(|e| e.to_string())?;
            println!("Reordered the {status} group.");
        }
        Command::Add {
            name,
            project,
            status,
            message,
            responsible,
        } => {
            let draft = TaskDraft {
                name,
                message,
                status,
                project,
                responsible: split_responsible(&responsible),
            };
            let key = session.create(draft).await.map_err(|e| e.to_string())?;
            println!("Created task {key}.");
        }
        Command::Edit {
            row,
            name,
            message,
            responsible,
        } => {
            let key = TaskKey::Row(RowId::new(row));
            let current = session
                .board()
                .task(&key)
                .ok_or_else(|| format!("no task at row {row}"))?;
            let edit = TaskEdit {
                name: name.unwrap_or_else(|| current.name.clone()),
                message: match message {
                    Some(m) if m.is_empty() => None,
                    Some(m) => Some(m),
                    None => current.message.clone(),
                },
                responsible: responsible
                    .map_or_else(|| current.responsible.clone(), |r| split_responsible(&r)),
            };
            session
                .save_edit(&key, edit)
                .await
                .map_err(|e| e.to_string())?;
            println!("Task {row} saved.");
        }
    }

    print_view(&session.view());
    Ok(())
}

/// Renders the projected board as plain text.
fn print_view(view: &ProjectedBoard) {
    if view.views.is_empty() {
        println!("No tasks.");
        return;
    }
    for project in &view.views {
        println!("{}", project.name);
        for group in &project.groups {
            println!("  [{}]", group.status);
            for task in &group.tasks {
                let who = if task.responsible.is_empty() {
                    String::new()
                } else {
                    format!("  ({})", join_responsible(&task.responsible))
                };
                let touched = task
                    .modified_at
                    .and_then(|ms| {
                        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(
                            i64::try_from(ms).ok()?,
                        )
                    })
                    .map(|dt| format!("  [{}]", dt.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default();
                let id = task.key.to_string();
                println!("    {id:>4}. {}{who}{touched}", task.name);
                if let Some(note) = &task.message {
                    println!("          {note}");
                }
            }
        }
    }
}

/// Initialize logging to stderr, or to a file when `--log-file` is given.
///
/// Returns a guard that must stay alive for the process lifetime when file
/// logging is active.
fn init_logging(log_level: &str, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if let Some(path) = log_file {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().map_or_else(
            || std::ffi::OsString::from("taskdesk.log"),
            std::ffi::OsStr::to_os_string,
        );
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}
