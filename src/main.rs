use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use smartspoon::food::{self, FoodReport, SaltEstimate};
use smartspoon::report::{self, Summary};
use smartspoon::sentiment::{self, SentimentBand, SAMPLE_FEEDBACK};
use smartspoon::serve::{self, ServerState};
use smartspoon::{ingest, Config, Database, Result, SurveyAggregate, ViewSettings};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "smartspoon")]
#[command(author, version, about = "Survey, food-photo and feedback analytics for the Smart Spoon")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./smartspoon.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show results and warnings
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the survey table and the age-group view if missing
    Init,

    /// Load a survey CSV, replacing the stored survey
    Load {
        /// CSV file (default: from config)
        csv: Option<PathBuf>,
    },

    /// Print market-research aggregates from the stored survey
    Market {
        /// Age histogram bin width in years
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        bin_width: Option<u32>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Also write the aggregate to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a food photo or a folder of photos
    Food(FoodArgs),

    /// Score feedback text (the sample feedback when none is given)
    Sentiment {
        /// Feedback text
        text: Option<String>,

        /// Read feedback from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API
    Serve {
        /// Port to listen on (default: from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the API index in a browser
        #[arg(long)]
        open: bool,
    },

    /// Print the default configuration as TOML
    Config,
}

#[derive(ClapArgs, Debug)]
struct FoodArgs {
    /// Image file or directory (optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI file picker
    #[arg(long)]
    gui: bool,

    /// Output report file (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "smartspoon-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate a report for folders
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open the report
    #[arg(long)]
    no_open: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let mut config = match Config::load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(ref db) = args.db {
        config.database.path = db.clone();
    }

    if let Err(e) = run(args, config) {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

fn run(args: Args, config: Config) -> Result<()> {
    debug!(?config, "effective config");
    let quiet = args.quiet;

    match args.command {
        Command::Init => {
            let db = Database::open_at(&config.database.path)?;
            println!(
                "Schema ready in {} ({} rows)",
                config.database.path.display(),
                db.count()?
            );
        }

        Command::Load { csv } => {
            let csv = csv.unwrap_or_else(|| config.ingest.csv_path.clone());
            let db = Database::open_at(&config.database.path)?;
            let summary = ingest::load_survey_csv(&db, &csv)?;

            println!("Loaded {} rows from {}", summary.rows, csv.display());
            if !summary.passthrough_columns.is_empty() {
                println!("  Extra columns:   {}", summary.passthrough_columns.join(", "));
            }
            if !summary.missing_columns.is_empty() {
                println!("  Missing columns: {}", summary.missing_columns.join(", "));
            }
            if summary.ages_nulled > 0 {
                println!("  Non-numeric ages stored as empty: {}", summary.ages_nulled);
            }
        }

        Command::Market { bin_width, json, output } => {
            let db = Database::open_at(&config.database.path)?;
            let records = db.load_survey()?;
            let aggregate =
                SurveyAggregate::from_records(&records, bin_width.unwrap_or(config.analysis.age_bin_width));

            if json {
                println!("{}", serde_json::to_string_pretty(&aggregate)?);
            } else {
                print_market(&aggregate);
            }
            if let Some(ref path) = output {
                report::write_survey_json(path, &aggregate)?;
                if !quiet {
                    eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", path.display());
                }
            }
        }

        Command::Food(food_args) => run_food(food_args, &config, quiet)?,

        Command::Sentiment { text, file, json } => {
            let text = match (text, file) {
                (Some(t), _) => t,
                (None, Some(f)) => std::fs::read_to_string(f)?,
                (None, None) => SAMPLE_FEEDBACK.to_string(),
            };
            let result = sentiment::score(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let color = match result.band {
                    SentimentBand::StrongPositive | SentimentBand::Positive => "\x1b[32m",
                    SentimentBand::Neutral => "\x1b[36m",
                    SentimentBand::Negative | SentimentBand::StrongNegative => "\x1b[31m",
                };
                println!("Sentiment score: {:.2}", result.polarity);
                println!("  [{}] {}%", gauge(result.gauge_percent(), 40), result.gauge_percent());
                println!("{}{}\x1b[0m", color, result.band);
                println!();
                println!("Positive keywords detected: {}", result.positive_keyword_count);
                println!("Negative keywords detected: {}", result.negative_keyword_count);
                if !result.negative_keywords_present.is_empty() {
                    println!("\x1b[33mNegative feedback detected about:\x1b[0m");
                    for word in &result.negative_keywords_present {
                        println!("  - {}", word);
                    }
                }
            }
        }

        Command::Serve { port, open } => {
            let db = Database::open_at(&config.database.path)?;
            let state = ServerState {
                db,
                settings: ViewSettings {
                    age_bin_width: config.analysis.age_bin_width,
                    max_upload_bytes: config.analysis.max_upload_bytes,
                    max_image_dimension: config.analysis.max_image_dimension,
                },
            };
            serve::start(
                port.unwrap_or(config.server.port),
                state,
                open || config.server.open_browser,
            )?;
        }

        Command::Config => print!("{}", Config::default_toml()),
    }

    Ok(())
}

fn print_market(aggregate: &SurveyAggregate) {
    println!("\x1b[1mMarket Research Insights\x1b[0m");
    println!("{}", "─".repeat(60));
    println!("Total respondents: {}\n", aggregate.total_respondents);

    println!("\x1b[1mAge distribution\x1b[0m (bin width {})", aggregate.age_bin_width);
    for bin in &aggregate.age_histogram {
        println!("  {:>3}-{:<3} {:>5}", bin.start, bin.end - 1, bin.count);
    }

    println!("\n\x1b[1mPurchase consideration by age group\x1b[0m");
    for g in &aggregate.purchase_by_age_group {
        let avg = g
            .avg_consideration
            .map(|a| format!("{:.2}", a))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<6} {:>5}  ({} respondents)", g.group.label(), avg, g.respondents);
    }

    println!("\n\x1b[1mMost desired features\x1b[0m");
    for f in &aggregate.feature_frequency {
        println!("  {:>5}  {}", f.count, f.feature);
    }

    println!("\n\x1b[1mDiet conditions\x1b[0m");
    for d in &aggregate.diet_distribution {
        println!("  {:>5}  {}", d.count, d.label());
    }
}

fn run_food(args: FoodArgs, config: &Config, quiet: bool) -> Result<()> {
    // With GUI feature: launch the picker if --gui or no path was given
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    let path = if use_gui {
        match pick_path() {
            Some(p) => p,
            None => {
                eprintln!("No file or folder selected.");
                std::process::exit(0);
            }
        }
    } else if let Some(p) = args.path.clone() {
        p
    } else {
        eprintln!("Usage: smartspoon food <PATH>");
        eprintln!("Note: GUI mode not available in this build.");
        std::process::exit(1);
    };

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let files = food::collect_images(&path);
    if files.is_empty() {
        eprintln!(
            "No images found (supported: {})",
            food::SUPPORTED_EXTENSIONS.join(", ")
        );
        std::process::exit(1);
    }

    if !quiet {
        eprintln!("\x1b[1mSmart Spoon - Food Recognition\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} image(s)\n", files.len());
    }

    let pb = if !quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let limits = config.analysis.image_limits();
    let reports: Vec<FoodReport> = files
        .par_iter()
        .map(|path| {
            let report = FoodReport::from_path(path, &limits);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(report.file_name.clone());
            }
            report
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    for r in &reports {
        print_food(r);
    }

    let summary = Summary::from_reports(&reports);
    if !quiet && reports.len() > 1 {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[32mLow salt:\x1b[0m    {}", summary.low_salt);
        eprintln!("  \x1b[33mMedium salt:\x1b[0m {}", summary.medium_salt);
        eprintln!("  \x1b[31mHigh salt:\x1b[0m   {}", summary.high_salt);
        if summary.error > 0 {
            eprintln!("  \x1b[90mErrors:\x1b[0m      {}", summary.error);
        }
    }

    // Folders get a report by default, single images only on request
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report && reports.len() > 1 {
        std::fs::create_dir_all(&args.report_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Some(args.report_dir.join(format!("smartspoon_food_{}.csv", timestamp)))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        report::generate(output_path, &reports)?;
        if !quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }

        if !args.no_open {
            if use_gui {
                let _ = open::that(output_path);
            } else if !quiet {
                eprint!("\nOpen report? [Y/n] ");
                io::stderr().flush().ok();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_ok() {
                    let input = input.trim().to_lowercase();
                    if input.is_empty() || input == "y" || input == "yes" {
                        if let Err(e) = open::that(output_path) {
                            eprintln!("Failed to open report: {}", e);
                        }
                    }
                }
            }
        }
    }

    if summary.error == summary.total {
        std::process::exit(1);
    }
    Ok(())
}

fn print_food(r: &FoodReport) {
    let Some(ref a) = r.analysis else {
        println!(
            "\x1b[90m{:<8}\x1b[0m {:<30}  {}",
            "[ERROR]",
            truncate(&r.file_name, 30),
            r.error.as_deref().unwrap_or("")
        );
        return;
    };

    let color = match a.salt_estimate {
        SaltEstimate::Low => "\x1b[32m",
        SaltEstimate::Medium => "\x1b[33m",
        SaltEstimate::High => "\x1b[31m",
    };
    let reset = "\x1b[0m";

    println!(
        "{}{:<8}{} {:<30}  {:<7} {:<10}  level {}  {:<6}  {}",
        color,
        format!("[{}]", a.salt_estimate),
        reset,
        truncate(&r.file_name, 30),
        a.salt_delta,
        a.food_type.to_string(),
        a.stimulation_level,
        a.flavor_intensity.to_string(),
        a.recommendation
    );
    debug!(
        file = %r.file_path,
        saturation = a.statistics.avg_saturation,
        brightness = a.statistics.avg_brightness,
        texture = a.statistics.texture,
        "image statistics"
    );
}

#[cfg(feature = "gui")]
fn pick_path() -> Option<PathBuf> {
    if let Some(folder) = rfd::FileDialog::new()
        .set_title("Select a folder of food photos (or Cancel for a single photo)")
        .pick_folder()
    {
        return Some(folder);
    }

    rfd::FileDialog::new()
        .set_title("Select a food photo")
        .add_filter("Images", food::SUPPORTED_EXTENSIONS)
        .pick_file()
}

#[cfg(not(feature = "gui"))]
fn pick_path() -> Option<PathBuf> {
    None
}

fn gauge(percent: u8, width: usize) -> String {
    let filled = (percent as usize * width / 100).min(width);
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
