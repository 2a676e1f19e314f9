//! Mimic - record a desktop task once, compile it into a SKILL.md
//!
//! Binary entry point: argument parsing, logging setup, prompts and the
//! mapping of library errors to exit codes.

use anyhow::Context;
use mimic::app::cli::{Cli, Commands, ConfigAction};
use mimic::app::config::Config;
use mimic::app::paths::{validate_task_name, Paths};
use mimic::capture::{self, EndReason, SessionSummary};
use mimic::codegen::skill_writer::{
    default_skills_dir, expand_tilde, resolve_destination, SkillWriter, SKILLS_DIR_ENV,
};
use mimic::session::{SessionOptions, SessionSnapshot};
use mimic::synthesis::model::ModelTier;
use mimic::synthesis::transport::{AnthropicTransport, Credential, API_KEY_ENV};
use mimic::synthesis::{resolve_tier, MODEL_ENV};
use mimic::workflow::{
    list_tasks, read_summary, wait_for_release, CompileOptions, CompileOutcome, Compiler,
    PreparedCompile, Recorder,
};
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Characters of the generated skill echoed after a compile
const PREVIEW_CHARS: usize = 600;

fn main() -> ExitCode {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Print an error with its remediation hint and pick the exit code
fn report(err: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {:#}", err);
    match err.downcast_ref::<mimic::Error>() {
        Some(e) => {
            if let Some(hint) = e.remediation() {
                eprintln!("  {}", hint);
            }
            ExitCode::from(e.exit_code())
        }
        None => ExitCode::FAILURE,
    }
}

/// Shared state for one command invocation
struct App {
    paths: Paths,
    config: Config,
    config_path: PathBuf,
    runtime: Runtime,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::from_env();
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    debug!(root = %paths.root().display(), config = %config_path.display(), "Paths resolved");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let app = App { paths, config, config_path, runtime };

    match cli.command {
        Commands::Start { task, privacy, auto_compile, yes } => {
            app.start(&task, privacy, auto_compile, yes)
        }
        Commands::Stop => app.stop(),
        Commands::Status => app.status(),
        Commands::Clear => app.clear(),
        Commands::Compile { task, model, cost_estimate } => app.compile(&task, model, cost_estimate),
        Commands::List => app.list(),
        Commands::Test => app.diagnostics(),
        Commands::Config { action } => app.config(action),
    }
}

impl App {
    fn recorder(&self) -> Recorder {
        Recorder::new(self.paths.clone(), self.config.clone())
    }

    fn start(&self, task: &str, privacy: bool, auto_compile: bool, yes: bool) -> anyhow::Result<()> {
        let task = validate_task_name(task)?.to_string();
        let mut privacy_blur = privacy;

        if !yes {
            if !std::io::stdin().is_terminal() {
                anyhow::bail!("stdin is not a terminal; pass --yes to consent to recording");
            }
            self.print_consent(&task);
            if !confirm("Start recording? [y/N] ")? {
                println!("Cancelled.");
                return Ok(());
            }
            if !privacy_blur {
                privacy_blur = confirm("Blur screenshots for privacy? [y/N] ")?;
            }
        }

        // Fail before claiming the session when there is nothing to record with
        let (screen, input) = capture::desktop_sources()?;

        // Armed before the marker exists so an early Ctrl+C still ends in release
        let interrupt = CancellationToken::new();
        let on_ctrlc = interrupt.clone();
        ctrlc::set_handler(move || on_ctrlc.cancel()).context("installing Ctrl+C handler")?;

        let recorder = self.recorder();
        let handle = recorder
            .store()
            .start(&task, SessionOptions { privacy_blur, auto_compile })?;

        println!(
            "Recording '{}'. Run 'mimic stop' or press Ctrl+C to finish (auto-stops after {}s).",
            task, self.config.capture.timeout_secs
        );
        let summary = self.runtime.block_on(recorder.record(
            handle,
            screen,
            input,
            capture::platform_inspector(),
            interrupt,
        ))?;
        self.print_summary(&summary);

        if auto_compile {
            println!();
            self.compile(&task, None, false)?;
        } else {
            println!("\nNext: mimic compile {}", task);
        }
        Ok(())
    }

    fn print_consent(&self, task: &str) {
        let capture = &self.config.capture;
        println!("mimic will record task '{}':", task);
        println!("  - a screenshot of your screen every {}s", capture.interval_secs);
        println!("  - mouse clicks and keystrokes (typing in password fields is redacted)");
        println!("  - for at most {}s", capture.timeout_secs);
        println!(
            "Everything stays in {} until you run 'mimic compile', which sends",
            self.paths.task(task).dir().display()
        );
        println!("selected screenshots and the action log to the model API.");
    }

    fn print_summary(&self, summary: &SessionSummary) {
        println!("\nRecording '{}' {}", summary.task_name, end_reason(summary.end_reason));
        println!("  Duration: {:.1}s", summary.duration_secs);
        println!("  Screenshots: {}", summary.screenshots);
        println!("  Actions: {}", summary.actions);
        println!("  Saved to: {}", self.paths.task(&summary.task_name).dir().display());
    }

    fn stop(&self) -> anyhow::Result<()> {
        let store = self.recorder().store();
        let ack = store.stop()?;
        let task = &ack.session.task_name;
        if ack.already_stopping {
            println!("Stop already requested for '{}'; waiting for the recorder...", task);
        } else {
            println!("Stopping '{}'...", task);
        }

        let grace = Duration::from_secs(self.config.capture.interval_secs.saturating_mul(2));
        if self.runtime.block_on(wait_for_release(&store, grace))? {
            match read_summary(&self.paths.task(task)) {
                Some(summary) => self.print_summary(&summary),
                None => println!("Recording stopped."),
            }
        } else {
            println!("The recorder has not finished yet; check again with 'mimic status'.");
        }
        Ok(())
    }

    fn status(&self) -> anyhow::Result<()> {
        match self.recorder().store().status()? {
            SessionSnapshot::Idle => println!("Idle: no recording in progress"),
            SessionSnapshot::Active { session, elapsed } => {
                let state = if session.is_stopping() { "stopping" } else { "recording" };
                println!(
                    "Active: '{}' {} ({:.0}s elapsed)",
                    session.task_name,
                    state,
                    elapsed.as_secs_f64()
                );
            }
            SessionSnapshot::Stale { reason } => {
                println!("Stale session marker: {}", reason);
                println!("Run 'mimic clear' to remove it");
            }
        }
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        if self.recorder().store().clear()? {
            println!("Session marker removed");
        } else {
            println!("No session marker to clear");
        }
        Ok(())
    }

    fn compile(&self, task: &str, model: Option<ModelTier>, cost_only: bool) -> anyhow::Result<()> {
        let env_model = std::env::var(MODEL_ENV).ok();
        let tier = resolve_tier(model, env_model.as_deref(), self.config.compile.model);
        // Checked before compression so a missing key fails fast
        let credential = if cost_only { None } else { Some(Credential::from_env()?) };

        let compiler = Compiler::new(self.paths.clone(), self.config.clone());
        let options = CompileOptions { tier, cost_only };
        let outcome = self.runtime.block_on(compiler.run(task, options, |cfg, prepared| {
            print_estimate(prepared, cfg.models.id_for(tier));
            let credential = credential.ok_or(mimic::Error::MissingCredential)?;
            let transport =
                AnthropicTransport::new(credential, Duration::from_secs(cfg.request_timeout_secs))?;
            println!("\nSending to the model API...");
            Ok(transport)
        }))?;

        let (skill, local_path) = match outcome {
            CompileOutcome::Estimated(prepared) => {
                print_estimate(&prepared, self.config.compile.models.id_for(tier));
                println!("\nCost estimate only; nothing was sent.");
                return Ok(());
            }
            CompileOutcome::Compiled { skill, local_path, .. } => (skill, local_path),
        };
        println!("Saved: {}", local_path.display());
        println!("\n{}\n", skill.preview(PREVIEW_CHARS));

        let env_dir = std::env::var(SKILLS_DIR_ENV).ok();
        let default = default_skills_dir();
        let destination = match resolve_destination(
            env_dir.as_deref(),
            self.config.output.skills_dir.as_deref(),
            &default,
        ) {
            Ok(dir) => Some(dir),
            Err(mimic::Error::DestinationNotFound { default }) => self.choose_destination(&default)?,
            Err(e) => return Err(e.into()),
        };

        if let Some(dir) = destination {
            let installed = SkillWriter::new(self.paths.task(&skill.metadata.task_name))
                .install(&skill, &dir)
                .with_context(|| format!("local copy kept at {}", local_path.display()))?;
            println!("Installed: {}", installed.display());
        }
        Ok(())
    }

    /// Ask where skills should go when no directory could be resolved.
    /// Non-interactive runs create the default.
    fn choose_destination(&self, default: &Path) -> anyhow::Result<Option<PathBuf>> {
        if !std::io::stdin().is_terminal() {
            info!(path = %default.display(), "Creating default skills directory");
            std::fs::create_dir_all(default)
                .with_context(|| format!("creating {}", default.display()))?;
            return Ok(Some(default.to_path_buf()));
        }

        println!("Skills directory not found (default: {})", default.display());
        println!("  1) Enter a custom path (saved to config)");
        println!("  2) Create the default directory");
        println!("  3) Skip installing");
        loop {
            match prompt_line("Choose [1-3]: ")?.as_str() {
                "1" => {
                    let raw = prompt_line("Path: ")?;
                    if raw.is_empty() {
                        continue;
                    }
                    let path = expand_tilde(Path::new(&raw));
                    std::fs::create_dir_all(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let mut updated = self.config.clone();
                    updated.output.skills_dir = Some(path.clone());
                    updated.save(&self.config_path)?;
                    println!("Saved skills_dir to {}", self.config_path.display());
                    return Ok(Some(path));
                }
                "2" => {
                    std::fs::create_dir_all(default)
                        .with_context(|| format!("creating {}", default.display()))?;
                    return Ok(Some(default.to_path_buf()));
                }
                "3" => {
                    println!("Skipped install; the skill stays in the recording folder.");
                    return Ok(None);
                }
                _ => println!("Please enter 1, 2 or 3"),
            }
        }
    }

    fn list(&self) -> anyhow::Result<()> {
        let recordings_dir = self.paths.recordings_dir();
        let listings = list_tasks(&self.paths)?;
        if listings.is_empty() {
            println!("No recordings found in {}", recordings_dir.display());
            println!("Start one with: mimic start <task>");
            return Ok(());
        }

        println!("Recordings in {}:", recordings_dir.display());
        for listing in &listings {
            let details = match &listing.summary {
                Some(s) => format!(
                    "{} actions, {:.0}s, {}",
                    s.actions,
                    s.duration_secs,
                    end_reason(s.end_reason)
                ),
                None => "no summary".to_string(),
            };
            println!(
                "  {:<24} {:>3} screenshots  {}{}",
                listing.task_name,
                listing.screenshots,
                details,
                if listing.has_skill { "  [SKILL.md]" } else { "" }
            );
        }
        Ok(())
    }

    fn diagnostics(&self) -> anyhow::Result<()> {
        println!("mimic {}", env!("CARGO_PKG_VERSION"));
        println!("  OS: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
        println!(
            "  Capture backend: {}",
            capture::backend_name().unwrap_or("missing (rebuild with --features desktop)")
        );
        match Credential::from_env() {
            Ok(credential) => println!("  {}: {}", API_KEY_ENV, credential.masked()),
            Err(_) => println!("  {}: not set", API_KEY_ENV),
        }
        println!("  Data root: {}", self.paths.root().display());
        println!(
            "  Config: {} ({})",
            self.config_path.display(),
            if self.config_path.exists() { "found" } else { "using defaults" }
        );

        let session = match self.recorder().store().status()? {
            SessionSnapshot::Idle => "idle".to_string(),
            SessionSnapshot::Active { session, .. } => format!("recording '{}'", session.task_name),
            SessionSnapshot::Stale { reason } => format!("stale ({})", reason),
        };
        println!("  Session: {}", session);

        let env_dir = std::env::var(SKILLS_DIR_ENV).ok();
        match resolve_destination(
            env_dir.as_deref(),
            self.config.output.skills_dir.as_deref(),
            &default_skills_dir(),
        ) {
            Ok(dir) => {
                let access = if !dir.exists() {
                    "will be created"
                } else if tempfile::tempfile_in(&dir).is_ok() {
                    "writable"
                } else {
                    "NOT writable"
                };
                println!("  Skills directory: {} ({})", dir.display(), access);
            }
            Err(mimic::Error::DestinationNotFound { default }) => {
                println!("  Skills directory: not found (default: {})", default.display());
            }
            Err(e) => return Err(e.into()),
        }

        println!("\nModels (USD per million tokens, in / out):");
        for tier in ModelTier::ALL {
            let pricing = tier.pricing();
            let marker = if tier == self.config.compile.model { "*" } else { " " };
            println!(
                " {}{:<9} {:<28} ${:>6.2} / ${:>6.2}  {}",
                marker,
                tier,
                self.config.compile.models.id_for(tier),
                pricing.input_per_mtok,
                pricing.output_per_mtok,
                tier.description()
            );
        }
        Ok(())
    }

    fn config(&self, action: ConfigAction) -> anyhow::Result<()> {
        match action {
            ConfigAction::Show => {
                println!("Configuration ({}):\n", self.config_path.display());
                println!("{}", self.config.to_toml()?);
            }
            ConfigAction::Init { force } => {
                if self.config_path.exists() && !force {
                    anyhow::bail!(
                        "Config already exists at {}. Use --force to overwrite.",
                        self.config_path.display()
                    );
                }
                let config = Config::default();
                config.save(&self.config_path)?;
                println!("Created config at {}", self.config_path.display());
                println!("\n{}", config.to_toml()?);
            }
        }
        Ok(())
    }
}

fn print_estimate(prepared: &PreparedCompile, model_id: &str) {
    let estimate = &prepared.estimate;
    println!(
        "Compiling '{}' with {} ({})",
        prepared.task.task_name, estimate.tier, model_id
    );
    println!(
        "  Screenshots: {} of {} recorded",
        estimate.image_count, prepared.artifacts.raw_screenshot_count
    );
    println!("  Actions: {}", prepared.artifacts.actions.len());
    println!(
        "  Estimated tokens: {} in / {} out",
        estimate.input_tokens, estimate.output_tokens
    );
    println!("  Estimated cost: ${:.4}", estimate.total_cost);
}

fn end_reason(reason: EndReason) -> &'static str {
    match reason {
        EndReason::Stopped => "stopped",
        EndReason::TimedOut => "timed out",
    }
}

/// Read one trimmed line from stdin after printing `prompt`
fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        anyhow::bail!("stdin closed while waiting for an answer");
    }
    Ok(line.trim().to_string())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let answer = prompt_line(prompt)?.to_ascii_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}
