//! CLI administration tool for shortlink.
//!
//! Manages domains, retires links, prunes visit history and shows
//! statistics directly against PostgreSQL, without going through HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Register and list domains
//! cargo run --bin admin -- domain add go.example.com
//! cargo run --bin admin -- domain list
//!
//! # Take a domain offline, then delete it moving its links to the default host
//! cargo run --bin admin -- domain disable go.example.com
//! cargo run --bin admin -- domain delete go.example.com --orphans reassign
//!
//! # Disable or purge a link
//! cargo run --bin admin -- link disable 42
//! cargo run --bin admin -- link purge 42
//!
//! # Hide visits older than 90 days
//! cargo run --bin admin -- history prune --days 90
//!
//! # Totals, or the summary of one link
//! cargo run --bin admin -- stats
//! cargo run --bin admin -- stats 42
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` or `DB_*` components (required)
//! - `REDIS_URL` / `REDIS_HOST` (optional): cached redirects are invalidated too

use shortlink::application::services::{DomainService, LinkService, StatsService};
use shortlink::config::{self, Config};
use shortlink::domain::entities::{Domain, LinkPatch, OrphanPolicy};
use shortlink::domain::repositories::HistoryFilter;
use shortlink::infrastructure::cache::{CacheService, NullCache, RedisCache};
use shortlink::infrastructure::persistence::{
    PgDomainRepository, PgHistoryRepository, PgLinkRepository,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing shortlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage serving domains
    Domain {
        #[command(subcommand)]
        action: DomainAction,
    },

    /// Retire links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Visit history retention
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show totals, or the click summary of one link
    Stats {
        /// Link id
        link_id: Option<i64>,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DomainAction {
    /// Register a new domain (available immediately)
    Add { name: String },

    /// List domains
    List {
        /// Only domains that currently serve links
        #[arg(long)]
        available: bool,
    },

    /// Start serving links on a domain
    Enable { domain: String },

    /// Stop serving links on a domain
    Disable { domain: String },

    /// Soft-delete a domain
    Delete {
        domain: String,

        /// What happens to bound links: retain, reassign or disable
        #[arg(long)]
        orphans: OrphanPolicy,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Stop redirecting a link, keeping it and its history
    Disable { id: i64 },

    /// Physically remove a link; its history rows stay without a link
    Purge {
        id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Soft-delete visits older than the retention window
    Prune {
        #[arg(long)]
        days: i64,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

type Domains = DomainService<PgDomainRepository, PgLinkRepository>;
type Links = LinkService<PgLinkRepository, PgDomainRepository>;
type Stats = StatsService<PgHistoryRepository, PgLinkRepository>;

struct Services {
    domains: Domains,
    links: Links,
    stats: Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Invalid configuration")?;
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL (or DB_* variables) must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Db { action } => handle_db_action(action, &pool).await?,
        Commands::Domain { action } => {
            let services = build_services(&config, &pool).await;
            handle_domain_action(action, &services).await?
        }
        Commands::Link { action } => {
            let services = build_services(&config, &pool).await;
            handle_link_action(action, &services).await?
        }
        Commands::History { action } => {
            let services = build_services(&config, &pool).await;
            handle_history_action(action, &services).await?
        }
        Commands::Stats { link_id } => {
            let services = build_services(&config, &pool).await;
            handle_stats(link_id, &services, &pool).await?
        }
    }

    Ok(())
}

async fn build_services(config: &Config, pool: &PgPool) -> Services {
    let cache: Arc<dyn CacheService> = match &config.redis_url {
        Some(url) => match RedisCache::connect(url, config.cache_ttl_seconds).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                println!(
                    "{} {}",
                    "Redis unavailable, cached redirects expire on their own:".yellow(),
                    e
                );
                Arc::new(NullCache::new())
            }
        },
        None => Arc::new(NullCache::new()),
    };

    let pool = Arc::new(pool.clone());
    let links = Arc::new(PgLinkRepository::new(pool.clone()));
    let domains = Arc::new(PgDomainRepository::new(pool.clone()));
    let history = Arc::new(PgHistoryRepository::new(pool));

    Services {
        domains: DomainService::new(domains.clone(), links.clone(), cache.clone()),
        links: LinkService::new(links.clone(), domains, cache),
        stats: StatsService::new(history, links),
    }
}

/// Finds a live domain by numeric id or by name.
async fn find_domain(services: &Services, domain: &str) -> Result<Domain> {
    if let Ok(id) = domain.parse::<i64>() {
        return Ok(services.domains.get_domain(id).await?);
    }

    let name = domain.trim().to_ascii_lowercase();
    services
        .domains
        .list_domains(false)
        .await?
        .into_iter()
        .find(|d| d.name == name)
        .with_context(|| format!("Domain '{}' not found", domain))
}

async fn handle_domain_action(action: DomainAction, services: &Services) -> Result<()> {
    match action {
        DomainAction::Add { name } => {
            let domain = services.domains.create_domain(&name).await?;
            println!(
                "{} {} (id {})",
                "Domain added:".green().bold(),
                domain.name.cyan(),
                domain.id
            );
        }
        DomainAction::List { available } => list_domains(services, available).await?,
        DomainAction::Enable { domain } => {
            let domain = find_domain(services, &domain).await?;
            services.domains.set_available(domain.id, true).await?;
            println!("{} {}", "Enabled".green().bold(), domain.name.cyan());
        }
        DomainAction::Disable { domain } => {
            let domain = find_domain(services, &domain).await?;
            let bound = services.domains.count_links(domain.id).await?;
            services.domains.set_available(domain.id, false).await?;
            println!(
                "{} {} ({} link(s) stop redirecting)",
                "Disabled".yellow().bold(),
                domain.name.cyan(),
                bound
            );
        }
        DomainAction::Delete {
            domain,
            orphans,
            yes,
        } => {
            let domain = find_domain(services, &domain).await?;
            let bound = services.domains.count_links(domain.id).await?;

            println!("  Domain: {}", domain.name.cyan());
            println!("  Bound links: {}", bound.to_string().bright_white());
            println!("  Orphan policy: {:?}", orphans);
            println!();

            if !yes
                && !Confirm::new()
                    .with_prompt("Delete this domain?")
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".red());
                return Ok(());
            }

            let affected = services.domains.delete_domain(domain.id, orphans).await?;
            println!(
                "{} {} ({} link(s) changed)",
                "Deleted".green().bold(),
                domain.name.cyan(),
                affected
            );
        }
    }

    Ok(())
}

/// Lists domains.
///
/// ```text
///   ID  Name                           Links   Status
///   ───────────────────────────────────────────────────
///   1   go.example.com                 12      AVAILABLE
///   2   old.example.com                3       DISABLED
/// ```
async fn list_domains(services: &Services, only_available: bool) -> Result<()> {
    let domains = services.domains.list_domains(only_available).await?;

    if domains.is_empty() {
        println!("{}", "  No domains found".yellow());
        return Ok(());
    }

    println!(
        "  {:<3} {:<30} {:<7} {:<10}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Links".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "─".repeat(55).bright_black());

    for domain in &domains {
        let links = services.domains.count_links(domain.id).await?;
        let status = if domain.available {
            "AVAILABLE".green()
        } else {
            "DISABLED".red()
        };

        println!(
            "  {:<3} {:<30} {:<7} {}",
            domain.id.to_string().bright_black(),
            domain.name.cyan(),
            links,
            status
        );
    }

    println!();
    println!("  Total: {}", domains.len().to_string().bright_white().bold());

    Ok(())
}

async fn handle_link_action(action: LinkAction, services: &Services) -> Result<()> {
    match action {
        LinkAction::Disable { id } => {
            let link = services.links.update(id, LinkPatch::availability(false)).await?;
            println!(
                "{} {} -> {}",
                "Disabled".yellow().bold(),
                link.short_name.cyan(),
                link.destination.bright_black()
            );
        }
        LinkAction::Purge { id, yes } => {
            let link = services.links.find(id).await?;

            println!("  Link: {} -> {}", link.short_name.cyan(), link.destination);
            if !link.is_deleted() {
                println!("  {}", "The link is live and will be deleted first".yellow());
            }
            println!();

            if !yes
                && !Confirm::new()
                    .with_prompt("Purge this link? This cannot be undone")
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".red());
                return Ok(());
            }

            if !link.is_deleted() {
                services.links.soft_delete(id).await?;
            }
            services.links.purge(id).await?;

            println!("{} {}", "Purged".green().bold(), link.short_name.cyan());
        }
    }

    Ok(())
}

async fn handle_history_action(action: HistoryAction, services: &Services) -> Result<()> {
    match action {
        HistoryAction::Prune { days } => {
            let pruned = services.stats.prune(days).await?;
            println!(
                "{} {} visit(s) older than {} day(s)",
                "Pruned".green().bold(),
                pruned.to_string().bright_white(),
                days
            );
        }
    }

    Ok(())
}

/// Displays totals, or the summary of one link.
async fn handle_stats(link_id: Option<i64>, services: &Services, pool: &PgPool) -> Result<()> {
    let Some(link_id) = link_id else {
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await?;
        let visits: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM link_histories WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;
        let domains: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM domains WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;

        println!("  Links:   {}", links.to_string().bright_green().bold());
        println!("  Visits:  {}", visits.to_string().bright_green().bold());
        println!("  Domains: {}", domains.to_string().bright_green().bold());
        return Ok(());
    };

    let link = services.links.find(link_id).await?;
    let summary = services
        .stats
        .summary(link_id, HistoryFilter::default())
        .await?;

    println!("  Link:            {} -> {}", link.short_name.cyan(), link.destination);
    println!("  Visits:          {}", summary.total.to_string().bright_green().bold());
    println!(
        "  Unique visitors: {}",
        summary.unique_visitors.to_string().bright_green().bold()
    );

    for (title, buckets) in [
        ("Browsers", &summary.browsers),
        ("Operating systems", &summary.operating_systems),
        ("Countries", &summary.countries),
    ] {
        println!();
        println!("  {}", title.bright_white().bold());
        for bucket in buckets {
            println!("    {:<24} {}", bucket.label, bucket.count);
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
        }
    }

    Ok(())
}
