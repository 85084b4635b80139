// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use console::{Emoji, Term};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use tvcheck::config::REGISTRY_FILE_NAME;
use tvcheck::{
    Config, MissingRegistry, NoopReporter, ProgressEvent, ProgressReporter, Registry,
    RegistryError, ReqwestClient, SERIES_URL_PREFIX, SeriesStatus, SharedProgressReporter,
    SyncOptions, TrackedSeries, create_local, format_rate, sync_all,
};

// Emoji with fallback for terminals without Unicode support
static TV: Emoji<'_, '_> = Emoji("📺 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static NEW: Emoji<'_, '_> = Emoji("🆕 ", "[+] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static SLEEP: Emoji<'_, '_> = Emoji("💤 ", "[=] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Check tracked episode lists and download new episodes
#[derive(Parser, Debug)]
#[command(name = "tvcheck")]
#[command(about = "Check tracked episode lists and download new episodes")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Series registry file (default: ~/.tvcheck/list)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Directory holding per-series episode records (default: ~/.tvcheck)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Directory episodes are downloaded to (default: ~/Downloads)
    #[arg(long, global = true)]
    dest: Option<PathBuf>,

    /// Number of series checked at the same time
    #[arg(short = 'c', long, default_value = "1", global = true)]
    concurrent: usize,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Never ask questions; fail instead
    #[arg(long, global = true)]
    no_prompt: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check all series and download new episodes (the default)
    Sync,

    /// Show tracked series
    #[command(alias = "l")]
    List,

    /// Track a new series
    #[command(alias = "n")]
    Add {
        /// Episode list URL, starting with http://fs.to/flist/
        url: Option<String>,
    },

    /// Show this help
    #[command(name = "h", hide = true)]
    ShortHelp,

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            main_bar,
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }

    fn start_bar(&self, series_id: usize, content_length: Option<u64>) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();

        let style = match content_length {
            Some(_) => ProgressStyle::default_bar()
                .template(&format!(
                    "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{percent:>3}}% {{bytes}}/{{total_bytes}} {{wide_msg}}"
                ))
                .unwrap()
                .progress_chars("█▓░"),
            None => ProgressStyle::default_bar()
                .template(&format!("  {DOWNLOAD}{{spinner:.cyan}} {{bytes}} {{wide_msg}}"))
                .unwrap(),
        };

        let bar = match bars.remove(&series_id) {
            Some(bar) => bar,
            None => self.multi.add(ProgressBar::new(0)),
        };
        bar.set_style(style);
        bar.set_length(content_length.unwrap_or(0));
        bar.set_position(0);
        bars.insert(series_id, bar.clone());
        bar
    }

    fn bar(&self, series_id: usize) -> Option<ProgressBar> {
        self.bars.lock().unwrap().get(&series_id).cloned()
    }

    fn finish_bar(&self, series_id: usize) {
        let mut bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.remove(&series_id) {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SyncStarting { series_count } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}Checking {} series",
                    series_count.to_string().cyan()
                ));
            }

            ProgressEvent::CheckingSeries { url, .. } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching list: {}", url.cyan()));
            }

            ProgressEvent::SeriesChecked { url, status, .. } => match status {
                SeriesStatus::UpToDate { count } => self.println(format!(
                    "{SLEEP}{} No new episodes. Already fetched {} episodes.",
                    url.dimmed(),
                    count.to_string().cyan()
                )),
                SeriesStatus::EmptyRemote { .. } => self.println(format!(
                    "{WARNING}{} Server returned an empty list. Register it again: {}",
                    "Empty list:".yellow().bold(),
                    url.yellow()
                )),
                SeriesStatus::Divergent {
                    remote_count,
                    local_count,
                } => self.println(format!(
                    "{WARNING}{} {} lists {} episodes but {} are recorded; left untouched",
                    "Divergent:".yellow().bold(),
                    url.yellow(),
                    remote_count,
                    local_count
                )),
                SeriesStatus::Pending { count } => self.println(format!(
                    "{TV}{} {} new episodes",
                    url.bold(),
                    count.to_string().green().bold()
                )),
            },

            ProgressEvent::DownloadStarting {
                series_id,
                episode_name,
                episode_index,
                total_to_download,
                content_length,
            } => {
                self.println(format!("{NEW}New episode: {}", episode_name.bold()));
                let bar = self.start_bar(series_id, content_length);
                bar.set_message(format!(
                    "[{}/{}] {}",
                    (episode_index + 1).to_string().cyan(),
                    total_to_download.to_string().cyan(),
                    truncate_title(&episode_name, 40)
                ));
            }

            ProgressEvent::DownloadProgress {
                series_id,
                episode_name,
                progress,
            } => {
                if let Some(bar) = self.bar(series_id) {
                    bar.set_position(progress.bytes_so_far());
                    if let Some(rate) = progress.rate() {
                        bar.set_message(format!(
                            "{} {}",
                            truncate_title(&episode_name, 40),
                            format_rate(rate).dimmed()
                        ));
                    }
                }
            }

            ProgressEvent::DownloadCompleted {
                series_id,
                episode_name,
                ..
            } => {
                self.finish_bar(series_id);
                self.println(format!(
                    "  {SUCCESS}{}",
                    truncate_title(&episode_name, 60).green()
                ));
            }

            ProgressEvent::DownloadFailed {
                series_id,
                episode_name,
                error,
            } => {
                self.finish_bar(series_id);
                self.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&episode_name, 40).red(),
                    error.red()
                ));
            }

            ProgressEvent::SeriesFailed { url, error, .. } => {
                self.println(format!("{FAILURE}{} - {}", url.red(), error.red()));
            }

            ProgressEvent::SyncCompleted {
                downloaded_count,
                up_to_date_count,
                failed_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} up to date, {} failed",
                    "Check complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    up_to_date_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn prompt(question: &str) -> Result<String> {
    let term = Term::stdout();
    term.write_str(question)?;
    Ok(term.read_line()?.trim().to_string())
}

/// Ask until the answer is Y or N; end of input counts as N
fn read_confirmation<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool> {
    let mut answer = String::new();
    loop {
        write!(output, "{question}")?;
        output.flush()?;

        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }

        match answer.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            _ => continue,
        }
    }
}

fn confirm(question: &str) -> Result<bool> {
    read_confirmation(&mut std::io::stdin().lock(), &mut std::io::stdout(), question)
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = Config::from_home_dir()?;

    if let Some(dir) = &args.state_dir {
        config.state_dir = dir.clone();
        config.registry_path = dir.join(REGISTRY_FILE_NAME);
    }
    if let Some(path) = &args.registry {
        config.registry_path = path.clone();
    }
    if let Some(dest) = &args.dest {
        config.destination_dir = dest.clone();
    }
    config.on_missing_registry = if args.no_prompt {
        MissingRegistry::Fail
    } else {
        MissingRegistry::Prompt
    };

    Ok(config)
}

/// Register a series and create its empty episode record
async fn register_series(config: &Config, url: &str) -> Result<Registry> {
    let registry = Registry::register(&config.registry_path, url)
        .with_context(|| format!("Failed to register {url}"))?;

    let series = TrackedSeries::from_registry_line(url, &config.state_dir)?;
    std::fs::create_dir_all(&config.state_dir).with_context(|| {
        format!(
            "Failed to create state directory {}",
            config.state_dir.display()
        )
    })?;
    create_local(&series.state_path).await?;

    Ok(registry)
}

async fn load_registry(config: &Config) -> Result<Registry> {
    match Registry::load(&config.registry_path) {
        Ok(registry) => Ok(registry),
        Err(RegistryError::NotFound(path)) => match config.on_missing_registry {
            MissingRegistry::Fail => bail!("No series registry found at {}", path.display()),
            MissingRegistry::Prompt => {
                println!("No list file found.");
                let url = prompt(&format!("Paste episode list url ({SERIES_URL_PREFIX}...): "))?;
                register_series(config, &url).await
            }
        },
        Err(e) => Err(e.into()),
    }
}

fn list_series(config: &Config) -> Result<()> {
    let registry = Registry::load(&config.registry_path).context("Failed to read series list")?;

    if registry.is_empty() {
        println!("No series tracked yet.");
    }
    for url in registry.urls() {
        println!("{url}");
    }

    Ok(())
}

async fn add_series(args: &Args, config: &Config, url: Option<String>) -> Result<()> {
    let url = match url {
        Some(url) => url,
        None if args.no_prompt => bail!("No series URL given"),
        None => prompt(&format!(
            "Provide URL of new list in format {SERIES_URL_PREFIX}...: "
        ))?,
    };

    register_series(config, &url).await?;

    if !args.quiet {
        println!("{SUCCESS}Tracking {}", url.trim().green());
    }

    Ok(())
}

async fn run_sync(args: &Args, config: &Config) -> Result<()> {
    config.prepare().context("Cannot start checking")?;
    let registry = load_registry(config).await?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            TV,
            "tvcheck".bold().magenta(),
            "- New episode checker".dimmed()
        );
    }

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let client = ReqwestClient::new();
    let options = SyncOptions {
        max_concurrent_series: args.concurrent,
    };

    let report = sync_all(
        &client,
        registry.urls(),
        &config.state_dir,
        &config.destination_dir,
        &options,
        reporter,
    )
    .await;

    if !args.quiet && report.failed() > 0 {
        println!("\n{}", "Failed series:".red().bold());
        for series in report.series.iter().filter(|s| s.is_failure()) {
            let error = match &series.result {
                Ok(outcome) => outcome
                    .failure
                    .as_ref()
                    .map(|f| format!("{}: {}", f.url, f.error))
                    .unwrap_or_default(),
                Err(e) => e.to_string(),
            };
            println!("  {}{} - {}", CROSS, series.url.yellow(), error.dimmed());
        }
    }

    if report.failed() > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = resolve_config(&args)?;

    match &args.command {
        Some(Command::List) => list_series(&config),
        Some(Command::Add { url }) => add_series(&args, &config, url.clone()).await,
        Some(Command::ShortHelp) => {
            Args::command().print_help()?;
            Ok(())
        }
        Some(Command::Unknown(words)) => {
            let name = words.first().map(String::as_str).unwrap_or_default();
            if args.no_prompt {
                bail!("Unknown command '{name}'");
            }
            if confirm(&format!("Unknown command '{name}'. Continue check? Y/N: "))? {
                run_sync(&args, &config).await
            } else {
                Ok(())
            }
        }
        Some(Command::Sync) | None => run_sync(&args, &config).await,
    }
}
