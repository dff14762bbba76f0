use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use semver::Version;
use serde::Serialize;

use geode_index_client::endpoints::ServerClient;
use geode_index_client::task::{Task, TaskEvent, TaskResult};
use geode_index_client::types::api::Progress;
use geode_index_client::types::models::dependency::parse_version;
use geode_index_client::types::models::mod_entity::{ModListResult, ModRecord};
use geode_index_client::types::models::mod_update::UpdateRecord;
use geode_index_client::types::models::platform::Platform;
use geode_index_client::types::query::{ModsQuery, ModsSort, DEFAULT_PAGE_SIZE};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Ignore cached responses and always ask the index
    #[arg(long, global = true)]
    pub no_cache: bool,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the index
    Mods {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        featured: Option<bool>,
        #[arg(long, value_enum, default_value_t = SortArg::Downloads)]
        sort: SortArg,
        #[arg(long)]
        developer: Option<String>,
        /// Starts at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: usize,
        /// Defaults to the platform this binary was built for
        #[arg(long = "platform")]
        platforms: Vec<Platform>,
    },
    /// Show a single mod
    Get { id: String },
    /// Download the logo of a mod
    Logo {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every tag the index knows
    Tags,
    /// Check installed mods for updates, given as `id@version`
    Updates {
        #[arg(required = true)]
        installed: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Downloads,
    RecentlyUpdated,
    RecentlyPublished,
}

impl From<SortArg> for ModsSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Downloads => ModsSort::Downloads,
            SortArg::RecentlyUpdated => ModsSort::RecentlyUpdated,
            SortArg::RecentlyPublished => ModsSort::RecentlyPublished,
        }
    }
}

/// Waits for `task`, logging its progress along the way.
async fn finish<T: Clone + Send + 'static>(task: Task<T>) -> TaskResult<T> {
    let mut events = task.subscribe();
    let mut last: Option<Progress> = None;
    while let Some(event) = events.next().await {
        match event {
            TaskEvent::Progress(p) => {
                if last.as_ref() != Some(&p) {
                    match p.percentage {
                        Some(pct) => log::debug!("{} {}%", p.message, pct),
                        None => log::debug!("{}", p.message),
                    }
                }
                last = Some(p);
            }
            TaskEvent::Finished(result) => return result,
        }
    }
    task.wait().await
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_mod_line(m: &ModRecord) {
    let developers = m
        .developers
        .iter()
        .map(|d| d.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "{} {} ({}) by {} - {} downloads",
        m.id(),
        m.latest_version().version(),
        m.name(),
        developers,
        m.download_count
    );
}

fn print_mod_list(result: &ModListResult, page: usize, per_page: usize) {
    for m in &result.mods {
        print_mod_line(m);
    }
    let pages = (result.total_mod_count as usize).div_ceil(per_page.max(1));
    println!("Page {} of {} ({} mods)", page, pages.max(1), result.total_mod_count);
}

fn print_mod(m: &ModRecord) {
    print_mod_line(m);
    if let Some(updated) = &m.updated_at {
        println!("Updated {}", updated.to_ago_string());
    }
    if !m.tags.is_empty() {
        println!(
            "Tags: {}",
            m.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    if let Some(repository) = &m.repository {
        println!("Repository: {}", repository);
    }
    for v in &m.versions {
        let geode = v
            .metadata
            .geode
            .as_ref()
            .map(|g| format!(", geode {}", g))
            .unwrap_or_default();
        println!("  {}{} - {}", v.version(), geode, v.download_url);
    }
}

fn parse_installed(installed: &[String]) -> anyhow::Result<HashMap<String, Version>> {
    installed
        .iter()
        .map(|entry| {
            let (id, version) = entry
                .split_once('@')
                .ok_or_else(|| anyhow!("Expected id@version, got {}", entry))?;
            let version =
                parse_version(version).ok_or_else(|| anyhow!("Invalid version in {}", entry))?;
            Ok((id.to_string(), version))
        })
        .collect()
}

pub async fn run(args: Args, client: &ServerClient) -> anyhow::Result<()> {
    let use_cache = !args.no_cache;
    match args.command {
        Commands::Mods {
            query,
            tags,
            featured,
            sort,
            developer,
            page,
            per_page,
            platforms,
        } => {
            let mut builder = ModsQuery::builder()
                .tags(tags)
                .featured(featured)
                .sorting(sort.into())
                .developer(developer)
                .page(page.saturating_sub(1))
                .page_size(per_page);
            if let Some(query) = query {
                builder = builder.query(query);
            }
            if !platforms.is_empty() {
                builder = builder.platforms(platforms);
            }
            let query = builder.build();

            let result = finish(client.get_mods(&query, use_cache)).await?;
            if args.json {
                print_json(&result)?;
            } else {
                print_mod_list(&result, query.page() + 1, query.page_size());
            }
        }
        Commands::Get { id } => {
            let result = finish(client.get_mod(&id, use_cache)).await?;
            if args.json {
                print_json(&result)?;
            } else {
                print_mod(&result);
            }
        }
        Commands::Logo { id, output } => {
            let logo = finish(client.get_mod_logo(&id, use_cache)).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.png", id)));
            tokio::fs::write(&path, &logo).await?;
            log::info!("Saved {} bytes to {}", logo.len(), path.display());
        }
        Commands::Tags => {
            let tags = finish(client.get_tags(use_cache)).await?;
            if args.json {
                print_json(&tags)?;
            } else {
                for tag in tags {
                    println!("{}", tag);
                }
            }
        }
        Commands::Updates { installed } => {
            let installed = parse_installed(&installed)?;
            let records = finish(client.check_updates(installed.keys().cloned(), use_cache)).await?;
            let pending: Vec<&UpdateRecord> = UpdateRecord::pending_updates(&records, &installed);
            if args.json {
                print_json(&pending)?;
            } else if pending.is_empty() {
                println!("Everything is up to date");
            } else {
                for update in pending {
                    println!(
                        "{}: {} -> {}",
                        update.id, installed[&update.id], update.version
                    );
                }
            }
        }
    }
    Ok(())
}
