use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use roster_core::timestamp::{format_day, format_visit, parse_day};
use roster_core::{CascadeDetector, Config, Gallery, SqliteVisitStore, VisitRecord};
use roster_hw::Camera;

#[derive(Parser)]
#[command(name = "roster", about = "Roster face-recognition attendance log")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recorded visits (default: today)
    Visits {
        /// Day to show, as YYYY-MM-DD or DD/MM/YYYY
        #[arg(short, long, value_parser = parse_day_arg, conflicts_with = "name")]
        date: Option<NaiveDate>,
        /// Show every recorded day for one person instead
        #[arg(short, long)]
        name: Option<String>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the known faces loaded from the gallery directory
    Gallery,
    /// List V4L2 capture devices
    Devices,
}

fn parse_day_arg(s: &str) -> Result<NaiveDate, String> {
    parse_day(s).map_err(|e| format!("expected YYYY-MM-DD or DD/MM/YYYY: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Visits { date, name, json } => {
            let store = SqliteVisitStore::open(&config.db_path)
                .with_context(|| format!("opening {}", config.db_path.display()))?;
            let visits = match &name {
                Some(name) => store.visits_for(name)?,
                None => store.visits_on(date.unwrap_or_else(|| Local::now().date_naive()))?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&visits)?);
            } else if visits.is_empty() {
                match (&name, date) {
                    (Some(name), _) => println!("No visits recorded for {name}"),
                    (None, Some(day)) => println!("No visits recorded on {}", format_day(day)),
                    (None, None) => println!("No visits recorded today"),
                }
            } else {
                print_visits(&visits);
            }
        }
        Commands::Gallery => {
            let mut detector = CascadeDetector::load(&config.model_path_str())?;
            let gallery = Gallery::load_dir(&config.gallery_dir, &mut detector)?;
            if gallery.is_empty() {
                println!("No faces found in {}", config.gallery_dir.display());
            }
            for (i, entry) in gallery.entries().iter().enumerate() {
                println!("{i:>3}  {:<20} {}", entry.label, entry.source.display());
            }
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}

fn print_visits(visits: &[VisitRecord]) {
    println!("{:>5}  {:<20} {:<20} {:<20}", "ID", "Name", "First seen", "Last seen");
    for v in visits {
        println!(
            "{:>5}  {:<20} {:<20} {:<20}",
            v.id,
            v.name,
            format_visit(v.first_seen),
            v.last_seen.map(format_visit).unwrap_or_else(|| "-".to_string()),
        );
    }
}
