use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use lessonplay::api::{ApiClient, Ledger, PopupService};
use lessonplay::app::LessonTarget;
use lessonplay::config::preferences::{FileVolumeStore, MemoryVolumeStore, VolumeStore};
use lessonplay::lesson::{LessonId, PopupDefinition};
use lessonplay::player::{PlaybackAdapter, PlaybackController, SdkGate, SimulatedSdk};
use lessonplay::popups::PopupScheduler;
use lessonplay::session::SubmissionReporter;
use lessonplay::ui::layout::format_time;
use lessonplay::{App, Config, LessonSession};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Video length assumed when neither the fixture nor the flags give one
const DEFAULT_DURATION_SECONDS: f64 = 600.0;

/// Column width for printed popups
const WRAP_WIDTH: usize = 76;

#[derive(Parser)]
#[command(name = "lessonplay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a lesson with its popups
    Play {
        /// Lesson identifier
        lesson: String,
        /// Video length in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Read lessons from a fixture file instead of the API
        #[arg(long)]
        offline: Option<PathBuf>,
        /// Wait for the user to press play
        #[arg(long)]
        no_autoplay: bool,
    },
    /// Print the popups scheduled for a lesson
    Popups {
        /// Lesson identifier
        lesson: String,
        /// Read lessons from a fixture file instead of the API
        #[arg(long)]
        offline: Option<PathBuf>,
    },
    /// List your popup submissions
    History {
        /// Page to show
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show the configuration file and its values
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Play { lesson, duration, offline, no_autoplay }) => {
            play(&config, LessonId::new(lesson), duration, offline.as_deref(), !no_autoplay).await?;
        }
        Some(Commands::Popups { lesson, offline }) => {
            let lesson = LessonId::new(lesson);
            let service = popup_service(&config, offline.as_deref())?;
            let popups = service.lesson_popups(&lesson).await?;
            print_popups(&lesson, &popups);
        }
        Some(Commands::History { page }) => {
            let reporter = SubmissionReporter::new(api_client(&config)?);
            let history = reporter.history(page).await?;
            if history.data.is_empty() {
                println!("No submissions yet");
            }
            for submission in &history.data {
                let correctness = match submission.is_correct {
                    Some(true) => "correct",
                    Some(false) => "incorrect",
                    None => "-",
                };
                println!(
                    "{:<10} {:<38} {:<10} {}",
                    submission.responded_at.as_deref().unwrap_or("-"),
                    submission.popup_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
                    correctness,
                    submission.answer.as_deref().unwrap_or("")
                );
            }
            println!("Page {} of {}", history.meta.current_page, history.meta.last_page.max(1));
        }
        Some(Commands::Config) => {
            println!("{}", Config::config_path()?.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Log to a file in the data directory; the terminal belongs to the UI
fn init_logging() {
    let log_file = Config::log_path().ok().and_then(|path| {
        std::fs::create_dir_all(path.parent()?).ok()?;
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lessonplay=info".into()),
        )
        .with(file_layer)
        .init();
}

fn api_client(config: &Config) -> Result<Arc<dyn PopupService>> {
    let client = ApiClient::new(&config.api_base_url, config.request_timeout())
        .context("Failed to create API client")?;
    Ok(Arc::new(client))
}

/// The offline ledger when a fixture is given, the HTTP API otherwise
fn popup_service(config: &Config, offline: Option<&Path>) -> Result<Arc<dyn PopupService>> {
    match offline {
        Some(path) => Ok(Arc::new(Ledger::from_fixture(path, config.user.clone())?)),
        None => api_client(config),
    }
}

async fn play(
    config: &Config,
    lesson: LessonId,
    duration: Option<f64>,
    offline: Option<&Path>,
    autoplay: bool,
) -> Result<()> {
    let (service, title, fixture_duration) = match offline {
        Some(path) => {
            let ledger = Ledger::from_fixture(path, config.user.clone())?;
            let (title, duration) = ledger
                .lesson(&lesson)
                .map(|fixture| (fixture.title.clone(), fixture.duration_seconds))
                .unwrap_or_default();
            let service: Arc<dyn PopupService> = Arc::new(ledger);
            (service, title, duration)
        }
        None => (api_client(config)?, String::new(), None),
    };
    let duration = duration.or(fixture_duration).unwrap_or(DEFAULT_DURATION_SECONDS);
    let title = if title.is_empty() { format!("Lesson {}", lesson) } else { title };

    let store: Box<dyn VolumeStore> = match FileVolumeStore::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("Volume will not be remembered: {:#}", e);
            Box::new(MemoryVolumeStore::default())
        }
    };

    let (adapter, events) = PlaybackAdapter::new(SimulatedSdk::new(duration), SdkGate::process());
    let session = LessonSession::new(
        adapter,
        PlaybackController::new(store),
        PopupScheduler::new(config.trailing_popup.clone()),
        SubmissionReporter::new(service),
        autoplay && config.autoplay,
    );

    let target = LessonTarget { media_id: lesson.to_string(), lesson, title };
    let mut app = App::new(config)?;
    app.run(session, events, target).await
}

fn print_popups(lesson: &LessonId, popups: &[PopupDefinition]) {
    if popups.is_empty() {
        println!("Lesson {} has no popups", lesson);
        return;
    }

    let indent = " ".repeat(8);
    let wrap = textwrap::Options::new(WRAP_WIDTH).initial_indent(&indent).subsequent_indent(&indent);

    for popup in popups {
        let requirement = if popup.mandatory { "mandatory" } else { "skippable" };
        println!(
            "{:>6}  {:<4}  {:<9}  {}",
            format_time(popup.appear_at_seconds),
            popup.kind.as_str(),
            requirement,
            popup.title
        );
        if !popup.content.is_empty() {
            println!("{}", textwrap::fill(&popup.content, &wrap));
        }
        for (i, answer) in popup.options.answers().iter().enumerate() {
            let letter = (b'A' + (i % 26) as u8) as char;
            println!("{}  {}) {}", indent, letter, answer.text);
        }
        println!();
    }
}
