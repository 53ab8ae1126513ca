use std::path::PathBuf;
use std::sync::Arc;

use chrono::Datelike;
use clap::{Parser, Subcommand};
use thiserror::Error;
use todoease_lib::{
    calendar::{month_title, DayStatus},
    config::{ClientConfig, ConfigError, ConfigStore, Language},
    date::{parse_date_key, YearMonth},
    events::{StateListener, StatePayload},
    gateway::{GatewayError, RestGateway},
    logging::{init_logging, log_directory},
    models::Task,
    store::TaskStore,
    view::ViewRequest,
};

#[derive(Error, Debug)]
enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("home directory not found")]
    NoHome,
}

#[derive(Parser)]
#[command(name = "todoease")]
#[command(author, version, about = "Day-pinned task list synced with the ToDoEase backend", long_about = None)]
struct Cli {
    /// Directory holding settings.json (defaults to ~/.todoease)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Backend URL, overriding settings and TODOEASE_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Show tasks for this day (YYYY-MM-DD) instead of today
    #[arg(long, conflicts_with = "all")]
    date: Option<String>,

    /// Show every task regardless of date
    #[arg(long)]
    all: bool,

    /// Calendar month to display (YYYY-MM)
    #[arg(long)]
    month: Option<String>,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Create a task
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Day to pin the task to (defaults to the shown day, else today)
        #[arg(long)]
        on: Option<String>,
    },
    /// Flip a task between done and not done
    Toggle { task_id: i64 },
    /// Flip a subtask between done and not done
    ToggleSubtask { subtask_id: i64 },
    /// Delete a task and its subtasks
    Delete { task_id: i64 },
    /// Add a subtask to a task
    Subtask { task_id: i64, title: String },
    /// Delete a subtask
    DeleteSubtask { subtask_id: i64 },
    /// Move a task to another day
    Move { task_id: i64, date: String },
    /// Print overall completion stats
    Stats,
}

struct LogListener;

impl StateListener for LogListener {
    fn state_updated(&self, payload: &StatePayload) {
        log::debug!(
            "state updated: incomplete={} completed={} month_total={}",
            payload.incomplete.len(),
            payload.completed.len(),
            payload.monthly_stats.total_tasks
        );
    }
}

fn parse_date_arg(input: &str) -> Result<chrono::NaiveDate, AppError> {
    parse_date_key(input).ok_or_else(|| AppError::Argument(format!("not a YYYY-MM-DD date: {input}")))
}

fn parse_month_arg(input: &str) -> Result<YearMonth, AppError> {
    let invalid = || AppError::Argument(format!("not a YYYY-MM month: {input}"));
    let (year, month) = input.trim().split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    YearMonth::new(year, month).ok_or_else(invalid)
}

fn load_config(cli: &Cli) -> Result<(PathBuf, ClientConfig), AppError> {
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => dirs::home_dir().ok_or(AppError::NoHome)?.join(".todoease"),
    };
    let mut config = ConfigStore::new(config_dir.clone()).load_config()?;
    config.apply_env_overrides();
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    Ok((config_dir, config))
}

fn status_mark(status: Option<DayStatus>) -> char {
    match status {
        Some(DayStatus::AllDone) => '*',
        Some(DayStatus::Partial) => '~',
        Some(DayStatus::NoneDone) => '!',
        None => ' ',
    }
}

fn print_calendar(payload: &StatePayload, language: Language) {
    println!("{}", month_title(payload.view.displayed_month(), language));
    let header = match language {
        Language::Zh => ["日", "一", "二", "三", "四", "五", "六"],
        Language::En => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
    };
    println!(" {}", header.map(|day| format!("{day:>3} ")).concat());
    for week in payload.calendar.chunks(7) {
        let row: String = week
            .iter()
            .map(|cell| {
                let (open, close) = if cell.is_selected {
                    ('[', ']')
                } else if cell.is_today {
                    ('(', ')')
                } else {
                    (' ', ' ')
                };
                if cell.in_month {
                    format!("{open}{:>2}{close}{}", cell.date.day(), status_mark(cell.status))
                } else {
                    "     ".to_string()
                }
            })
            .collect();
        println!("{row}");
    }
}

fn print_column(title: &str, tasks: &[Task], payload: &StatePayload) {
    println!("\n{title} ({})", tasks.len());
    for task in tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        let fold = if payload.collapsed.contains(&task.id) {
            " [+]"
        } else {
            ""
        };
        println!("  [{mark}] #{} {} ({}){fold}", task.id, task.title, task.task_date);
        if !task.description.is_empty() {
            println!("        {}", task.description);
        }
        if payload.collapsed.contains(&task.id) {
            continue;
        }
        for subtask in &task.subtasks {
            let mark = if subtask.completed { 'x' } else { ' ' };
            println!("      [{mark}] #{} {}", subtask.id, subtask.title);
        }
    }
}

fn print_state(payload: &StatePayload, language: Language) {
    print_calendar(payload, language);
    let stats = payload.monthly_stats;
    println!(
        "\n{}/{} done this month ({}%)",
        stats.completed_tasks,
        stats.total_tasks,
        stats.completion_rate()
    );
    let (todo, done) = match language {
        Language::Zh => ("待完成", "已完成"),
        Language::En => ("To do", "Done"),
    };
    print_column(todo, &payload.incomplete, payload);
    print_column(done, &payload.completed, payload);
}

async fn run_action(store: &TaskStore<RestGateway>, action: Action) -> Result<(), AppError> {
    let applied = match action {
        Action::Add {
            title,
            description,
            on,
        } => {
            let date = on.as_deref().map(parse_date_arg).transpose()?;
            match store.create_task(&title, &description, date).await {
                Some(task_id) => {
                    println!("created task #{task_id}");
                    true
                }
                None => false,
            }
        }
        Action::Toggle { task_id } => store.toggle_task(task_id).await,
        Action::ToggleSubtask { subtask_id } => store.toggle_subtask(subtask_id).await,
        Action::Delete { task_id } => store.delete_task(task_id).await,
        Action::Subtask { task_id, title } => match store.create_subtask(task_id, &title).await {
            Some(subtask_id) => {
                println!("created subtask #{subtask_id}");
                true
            }
            None => false,
        },
        Action::DeleteSubtask { subtask_id } => store.delete_subtask(subtask_id).await,
        Action::Move { task_id, date } => {
            let date = parse_date_arg(&date)?;
            store.reschedule_task(task_id, date).await
        }
        Action::Stats => {
            match store.overall_stats().await {
                Some(stats) => println!(
                    "{}/{} tasks done ({:.1}%)",
                    stats.completed_tasks, stats.total_tasks, stats.completion_percentage
                ),
                None => println!("stats unavailable"),
            }
            true
        }
    };
    if !applied {
        eprintln!("the backend did not accept the change; see the log for details");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let (config_dir, config) = load_config(&cli)?;
    init_logging(&log_directory(&config_dir, config.log_dir.as_deref()))?;
    log::info!("todoease starting base_url={}", config.base_url);

    let selected = cli.date.as_deref().map(parse_date_arg).transpose()?;
    let month = cli.month.as_deref().map(parse_month_arg).transpose()?;

    let language = config.language();
    let gateway = RestGateway::new(&config)?;
    let store = TaskStore::new(gateway).with_listener(Arc::new(LogListener));

    if let Err(err) = store.load().await {
        eprintln!("tasks unavailable: {err}");
    }
    store
        .apply_view(ViewRequest {
            all: cli.all,
            date: selected,
            month,
        })
        .await;
    if let Some(action) = cli.action {
        run_action(&store, action).await?;
    }

    print_state(&store.snapshot(), language);
    Ok(())
}
