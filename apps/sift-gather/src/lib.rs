use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sift_domain::{Idea, Location};
use sift_service::{CacheStore, PgCacheStore, SiftService};
use sift_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Short product name, e.g. "Loom".
	#[arg(long)]
	pub title: String,
	#[arg(long)]
	pub one_liner: String,
	#[arg(long)]
	pub category: Option<String>,
	/// Location hint stored on the idea.
	#[arg(long)]
	pub location: Option<String>,
	/// Overrides the idea's location hint for every search.
	#[arg(long)]
	pub country: Option<String>,
	#[arg(long, requires = "country")]
	pub region: Option<String>,
	/// Print the planned queries and exit without searching.
	#[arg(long)]
	pub plan_only: bool,
}
impl Args {
	pub fn idea(&self) -> Idea {
		Idea {
			title: self.title.clone(),
			one_liner: self.one_liner.clone(),
			category: self.category.clone(),
			location: self.location.clone(),
		}
	}

	pub fn location_override(&self) -> Option<Location> {
		self.country
			.as_ref()
			.map(|country| Location { country: Some(country.clone()), region: self.region.clone() })
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	init_tracing(&config)?;

	let idea = args.idea();

	if idea.title.trim().is_empty() && idea.one_liner.trim().is_empty() {
		return Err(eyre::eyre!("Either --title or --one-liner must be non-empty."));
	}

	let cancel = CancellationToken::new();
	let _shutdown = cancel.clone().drop_guard();
	let store = if config.cache.enabled && !args.plan_only {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let store: Arc<dyn CacheStore> = Arc::new(PgCacheStore::new(db));

		Some(store)
	} else {
		None
	};
	let service = SiftService::new(config, store, cancel.clone());

	if args.plan_only {
		let queries = service.plan(&idea);

		println!("{}", serde_json::to_string_pretty(&queries)?);

		return Ok(());
	}

	let location = args.location_override();
	let gathered = service.gather(&idea, location.as_ref(), &cancel).await;

	if gathered.partial {
		tracing::warn!(kept = gathered.evidence.len(), "Search was cut short; output is partial.");
	}

	println!("{}", serde_json::to_string_pretty(&gathered)?);

	Ok(())
}

fn init_tracing(config: &sift_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();

	Ok(())
}
