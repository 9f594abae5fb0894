use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_dotenv::dotenv::DotEnv;
use surrealdb::{Surreal, engine::any::Any};
use tracing_subscriber::EnvFilter;

mod config;
mod core;
mod hierarchy;
mod pillars;
mod report;
mod scaffold;
mod schema;
mod seed;
mod status;
mod taxonomy;

use config::{DbCfg, SeedCfg, connect};
use schema::run_setup;
use seed::SeedOpts;
use status::status;

#[derive(Parser, Debug)]
#[command(version, about = "Seed the ESG assessment taxonomy into SurrealDB")]
pub struct Cli {
	/// Increase output
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Write database/pillars.toml with the default pillars
	Init,
	/// Define the taxonomy tables without touching their rows
	Setup,
	/// Print the grouped hierarchy without connecting
	Plan {
		#[arg(long)]
		file: Option<PathBuf>,
	},
	/// Replace the stored taxonomy with the contents of the input file
	Seed {
		#[arg(long)]
		file: Option<PathBuf>,
		#[arg(long)]
		dry_run: bool,
		#[arg(long)]
		json_out: Option<PathBuf>,
	},
	/// Show persisted counts and the last seed run
	Status {
		#[arg(long)]
		file: Option<PathBuf>,
	},
}

fn load_env() -> DotEnv {
	// Load .env in CWD if present, ignore missing
	DotEnv::new("")
}

fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Cli::parse();
	init_tracing(args.verbose);
	let env = load_env();

	match args.command {
		Commands::Init => scaffold::scaffold()?,
		Commands::Setup => {
			let db = connect_from_env(&env).await?;
			run_setup(&db).await?;
			println!("taxonomy schema defined");
		}
		Commands::Plan { file } => {
			let cfg = SeedCfg::from_env(&env, file);
			let pillars = pillars::load_pillars(&cfg.pillars_file)?;
			let loaded = taxonomy::load_document(&cfg.taxonomy_file)?;
			let plan = hierarchy::plan_document(&loaded.document, &pillars)?;
			print!("{}", report::render_plan(&plan));
		}
		Commands::Seed {
			file,
			dry_run,
			json_out,
		} => {
			let db_cfg = DbCfg::from_env(&env)?;
			let cfg = SeedCfg::from_env(&env, file);
			seed::seed(&db_cfg, &cfg, &SeedOpts { dry_run, json_out }).await?;
		}
		Commands::Status { file } => {
			let cfg = SeedCfg::from_env(&env, file);
			let db = connect_from_env(&env).await?;
			status(&db, &cfg.taxonomy_file).await?;
		}
	}

	Ok(())
}

async fn connect_from_env(env: &DotEnv) -> anyhow::Result<Surreal<Any>> {
	let cfg = DbCfg::from_env(env)?;
	connect(&cfg).await
}
