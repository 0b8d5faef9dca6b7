use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use plan_focus::backup::BackupCodec;
use plan_focus::integrator::Integration;
use plan_focus::logging::init_logging;
use plan_focus::scheduler::TimerDriver;
use plan_focus::settings::{SettingsDraft, SETTINGS_KEY};
use plan_focus::stats::bar_ratio;
use plan_focus::{AppState, Clock, DateKey, FileStore, SystemClock, TimerMode};

#[derive(Parser, Debug)]
#[command(name = "plan-focus", version, about = "Focus timer, day timeline and todo list")]
struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Day to operate on, YYYY-MM-DD (defaults to today)
    #[arg(long, global = true)]
    date: Option<DateKey>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a countdown and record it when it completes
    Focus {
        /// work, short or long
        #[arg(long, default_value = "work")]
        mode: TimerMode,
    },
    /// Show the day's timeline, todos and focus time
    Show,
    /// Focus minutes for the last seven days
    Week,
    /// Days that have any recorded content
    Active,
    /// Add a todo
    Todo { text: String },
    /// Toggle a todo between open and done
    Toggle { id: String },
    /// Delete a todo
    Untodo { id: String },
    /// Add a manual timeline entry
    Block {
        start: String,
        end: String,
        title: String,
    },
    /// Remove a timeline entry
    Unblock { id: String },
    /// Show or change timer durations in minutes
    Config {
        #[arg(long)]
        work: Option<String>,
        #[arg(long)]
        short: Option<String>,
        #[arg(long = "long")]
        long_break: Option<String>,
        /// Restore 25/5/15
        #[arg(long)]
        reset: bool,
    },
    /// Write a backup file
    Export {
        /// Target directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Restore from a backup file
    Import { file: PathBuf },
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    let dirs = ProjectDirs::from("", "", "plan-focus").context("no home directory available")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = data_dir(&cli)?;
    init_logging(&root).context("failed to initialize logging")?;

    let store = Arc::new(FileStore::open(root.clone()).context("failed to open storage")?);
    let state = AppState::new(store.clone(), SystemClock);
    if let Some(date) = cli.date {
        state.select_date(date);
    }

    match cli.command {
        Command::Focus { mode } => focus(&state, mode).await?,
        Command::Show => show(&state),
        Command::Week => {
            let week = state.weekly();
            for day in &week {
                let bar = "#".repeat((bar_ratio(day, &week) * 20.0).round() as usize);
                println!("{:>5} {:<20} {}m", day.label, bar, day.minutes);
            }
        }
        Command::Active => {
            for date in state.records().list_active_dates() {
                println!("{date}");
            }
        }
        Command::Todo { text } => {
            let todo = state.add_todo(&text)?;
            println!("added {}", todo.id);
        }
        Command::Toggle { id } => {
            let todo = state.toggle_todo(&id)?;
            println!("{} {}", if todo.completed { "done" } else { "open" }, todo.text);
        }
        Command::Untodo { id } => state.delete_todo(&id)?,
        Command::Block { start, end, title } => {
            let item = state.add_schedule_item(&start, &end, &title)?;
            println!("added {}", item.id);
        }
        Command::Unblock { id } => state.remove_schedule_item(&id)?,
        Command::Config {
            work,
            short,
            long_break,
            reset,
        } => {
            let mut draft = SettingsDraft::new(state.config());
            if reset {
                draft.reset_to_defaults();
            }
            for (mode, input) in [
                (TimerMode::Work, work),
                (TimerMode::ShortBreak, short),
                (TimerMode::LongBreak, long_break),
            ] {
                if let Some(input) = input {
                    draft.edit(mode, &input)?;
                }
            }
            if draft.config() != state.config() && !state.update_config(draft.config()) {
                bail!("failed to save {SETTINGS_KEY}");
            }
            let config = state.config();
            println!("work={} short={} long={}", config.work, config.short, config.long);
        }
        Command::Export { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let path = BackupCodec::new(store).export_to_dir(&dir, &SystemClock.today())?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let report = BackupCodec::new(store).import_file(&file)?;
            state.reload();
            println!("restored {} entries", report.written.len());
        }
    }
    Ok(())
}

async fn focus(state: &AppState<FileStore, SystemClock>, mode: TimerMode) -> Result<()> {
    let (mut driver, mut completions) = TimerDriver::new(state.config());
    driver.switch_mode(mode);
    driver.start();
    println!("{mode} {} started, ctrl-c to abandon", driver.snapshot().remaining_display());

    let event = tokio::select! {
        event = completions.recv() => event.context("timer stopped unexpectedly")?,
        _ = tokio::signal::ctrl_c() => {
            driver.reset();
            println!("abandoned");
            return Ok(());
        }
    };
    match state.record_session(&event) {
        Integration::Ignored => println!("{mode} finished"),
        Integration::Displayed(item) | Integration::Stored { item, .. } => {
            println!("recorded {}-{} ({}m)", item.start_time, item.end_time, event.duration_minutes)
        }
    }
    Ok(())
}

fn show(state: &AppState<FileStore, SystemClock>) {
    let daily = state.daily();
    let summary = state.summary();
    let marker = if state.is_read_only() { " (history)" } else { "" };
    println!("{}{marker}", daily.date);
    println!(
        "focus {}h {}m, {} entries, {} open todos",
        summary.focus_hours, summary.focus_remainder_minutes, summary.schedule_items, summary.pending_todos
    );
    for item in &daily.schedule {
        println!("  {}-{} {} [{:?}] {}", item.start_time, item.end_time, item.title, item.kind, item.id);
    }
    for todo in &daily.todos {
        let check = if todo.completed { "x" } else { " " };
        println!("  [{check}] {} {}", todo.text, todo.id);
    }
}
