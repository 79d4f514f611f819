use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpbl_schedule::config::{init_logging, Settings};
use cpbl_schedule::utils::data::{load_from_cache, save_to_cache, save_to_csv};
use cpbl_schedule::{build_scraper, BoxEntry, CapturedSite, Day, ScheduleEntry};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cli", about = "CPBL schedule scraper")]
struct Cli {
    /// Read captured pages from this directory instead of the live site
    #[arg(long, global = true)]
    pages: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the games for a day
    Show {
        #[arg(value_enum, default_value_t = Day::Today)]
        day: Day,
        /// Print JSON instead of one line per game
        #[arg(long)]
        json: bool,
        /// Also write the games to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Also write the games to a JSON cache file
        #[arg(long)]
        save: Option<PathBuf>,
        /// Read games from a JSON cache file written by --save instead of fetching
        #[arg(long, conflicts_with = "save")]
        from_cache: Option<PathBuf>,
    },
    /// Save the rendered pages of all three days for offline use
    Capture { dir: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if cli.pages.is_some() {
        settings.captured_pages_dir = cli.pages.clone();
    }
    init_logging(&settings);

    let scraper = build_scraper(&settings)?;

    match cli.command {
        Command::Show {
            day,
            json,
            csv,
            save,
            from_cache,
        } => {
            let output = Output {
                json,
                csv: csv.as_deref(),
                save: save.as_deref(),
            };
            match day {
                Day::Yesterday => {
                    let games: Vec<BoxEntry> = match &from_cache {
                        Some(path) => load_from_cache(path)?,
                        None => scraper
                            .fetch_previous()
                            .await
                            .context("Failed to fetch yesterday's games")?,
                    };
                    output.emit(&games, BoxEntry::format)?;
                }
                Day::Today => {
                    let games: Vec<ScheduleEntry> = match &from_cache {
                        Some(path) => load_from_cache(path)?,
                        None => scraper
                            .fetch_current()
                            .await
                            .context("Failed to fetch today's games")?,
                    };
                    output.emit(&games, ScheduleEntry::format)?;
                }
                Day::Tomorrow => {
                    let games: Vec<ScheduleEntry> = match &from_cache {
                        Some(path) => load_from_cache(path)?,
                        None => scraper
                            .fetch_next()
                            .await
                            .context("Failed to fetch tomorrow's games")?,
                    };
                    output.emit(&games, ScheduleEntry::format)?;
                }
            }
        }
        Command::Capture { dir } => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for day in [Day::Today, Day::Yesterday, Day::Tomorrow] {
                let html = scraper
                    .capture(day)
                    .await
                    .with_context(|| format!("Failed to capture {}", day))?;
                let path = dir.join(CapturedSite::file_name(day));
                std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved {} to {}", day, path.display());
            }
        }
    }

    Ok(())
}

struct Output<'a> {
    json: bool,
    csv: Option<&'a Path>,
    save: Option<&'a Path>,
}

impl Output<'_> {
    fn emit<T: Serialize>(&self, games: &[T], line: impl Fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(games)?);
        } else if games.is_empty() {
            println!("No games.");
        } else {
            for (i, game) in games.iter().enumerate() {
                println!("{}. {}", i + 1, line(game));
            }
        }

        if let Some(path) = self.csv {
            save_to_csv(games, path)?;
            println!("\nSaved {} games to {}", games.len(), path.display());
        }
        if let Some(path) = self.save {
            save_to_cache(games, path)?;
            println!("\nSaved {} games to {}", games.len(), path.display());
        }
        Ok(())
    }
}
