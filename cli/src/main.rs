//! lenscrl CLI - section-aware image extraction from PDF manuals

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use lenscrl::{ExtractionConfig, LensCrl, PageSelection};

#[derive(Parser)]
#[command(name = "lenscrl")]
#[command(version)]
#[command(about = "Extract images from PDF manuals, named after the section they illustrate", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every document command.
#[derive(clap::Args)]
struct RunArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Manual name used in filenames (deduced when absent)
    #[arg(short, long, env = "LENSCRL_MANUAL")]
    manual: Option<String>,

    /// Filename prefix
    #[arg(long)]
    prefix: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip undecodable pages and images
    #[arg(long)]
    lenient: bool,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and name every valid image
    Extract {
        #[command(flatten)]
        args: RunArgs,

        /// Output directory (defaults to <FILE stem>_images)
        #[arg(value_name = "OUTDIR")]
        output: Option<PathBuf>,
    },

    /// Show the names images would get, without writing
    Plan {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Show sections, learned heading pattern and page layouts
    Analyze {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Extract { args, output } => cmd_extract(&args, output.as_deref()),
        Commands::Plan { args } => cmd_plan(&args),
        Commands::Analyze { args } => cmd_analyze(&args),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn builder(args: &RunArgs) -> Result<LensCrl, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => ExtractionConfig::from_json_file(path)?,
        None => ExtractionConfig::default(),
    };

    let mut lens = LensCrl::with_config(config);
    if let Some(manual) = &args.manual {
        lens = lens.with_manual_name(manual);
    }
    if let Some(prefix) = &args.prefix {
        lens = lens.with_prefix(prefix);
    }
    if args.lenient {
        lens = lens.lenient();
    }
    if let Some(p) = &args.pages {
        let selection = PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?;
        lens = lens.with_pages(selection);
    }
    Ok(lens)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

fn cmd_extract(args: &RunArgs, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = args.input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_images", stem))
    });

    let pb = (!args.json).then(|| spinner("Extracting images..."));
    let result = builder(args)?.extract(&args.input, &output_dir)?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for file in &result.files {
            println!(
                "{} {} {}",
                "Extracted".green(),
                file.filename,
                format!("(page {})", file.page + 1).dimmed()
            );
        }
        for error in &result.errors {
            println!("{} {}", "Failed".red(), error);
        }

        let stats = &result.statistics;
        println!();
        println!(
            "{} {}/{} images extracted into {} ({} filtered, {} sections, {} ms)",
            "Done!".green().bold(),
            stats.images_extracted,
            stats.images_total,
            output_dir.display(),
            stats.images_filtered_out,
            stats.sections_found,
            stats.processing_time_ms
        );
    }

    if !result.success {
        return Err("extraction failed".into());
    }
    Ok(())
}

fn cmd_plan(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let plan = builder(args)?.plan(&args.input)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{}: {}", "Manual".bold(), plan.manual_name);
    if let Some(reason) = &plan.detection_degraded {
        println!("{}: {}", "Adaptive detection skipped".yellow(), reason);
    }
    println!();

    for image in &plan.images {
        println!(
            "  {} {} {}",
            "├─".dimmed(),
            image.filename,
            format!("(page {}, {:?})", image.region.page + 1, image.analysis.image_type).dimmed()
        );
    }
    for rejected in &plan.rejected {
        println!(
            "  {} {} {}",
            "✗".red(),
            format!("page {} image {}", rejected.page + 1, rejected.index + 1),
            rejected.analysis.verdict.to_string().dimmed()
        );
    }

    println!();
    println!(
        "{} images named, {} rejected",
        plan.images.len(),
        plan.rejected.len()
    );
    Ok(())
}

fn cmd_analyze(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = builder(args)?.analyze(&args.input)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("{}", "Document Analysis".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), args.input.display());
    println!("{}: {}", "Pages".bold(), analysis.page_count);
    println!("{}: {}", "Manual".bold(), analysis.manual_name);
    println!("{}: {}", "Images".bold(), analysis.image_count);
    println!(
        "{}: {}",
        "Adapted".bold(),
        if analysis.adapted { "Yes" } else { "No" }
    );

    if let Some(pattern) = &analysis.pattern {
        println!(
            "{}: sizes {:?}, bold {}, confidence {:.2}",
            "Heading pattern".bold(),
            pattern.font_sizes,
            pattern.bold,
            pattern.confidence
        );
    }

    println!();
    println!("{}", "Sections".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for section in &analysis.sections {
        let indent = "  ".repeat(section.depth().saturating_sub(1));
        println!(
            "{}{} {} {}",
            indent,
            section.number.bold(),
            section.title,
            format!("(page {})", section.page + 1).dimmed()
        );
    }

    let multi: Vec<String> = analysis
        .layouts
        .iter()
        .filter(|l| l.columns > 1)
        .map(|l| (l.page + 1).to_string())
        .collect();
    if !multi.is_empty() {
        println!();
        println!("{}: {}", "Multi-column pages".bold(), multi.join(", "));
    }

    Ok(())
}

fn cmd_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ExtractionConfig::default().to_json()?);
    Ok(())
}
