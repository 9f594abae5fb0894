use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rust_dotenv::dotenv::DotEnv;
use surrealdb::{Surreal, engine::any::Any, opt::auth::Root};
use tracing::debug;

use crate::core::create_surreal_client;

pub const DEFAULT_DATABASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_NAMESPACE: &str = "esg";
pub const DEFAULT_DATABASE: &str = "esg";
pub const DEFAULT_TAXONOMY_FILE: &str = "esg_questions_complete.json";
pub const PILLARS_FILE: &str = "database/pillars.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
	pub user: String,
	pub pass: String,
}

/// Connection settings for the target database.
#[derive(Debug, Clone)]
pub struct DbCfg {
	url: String,
	ns: String,
	db: String,
	credentials: Option<Credentials>,
}

impl DbCfg {
	pub fn from_env(env: &DotEnv) -> Result<Self> {
		Self::from_lookup(|key| env.get_var(key.to_string()))
	}

	/// Builds the config from any key lookup; empty values count as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		let url = get("DATABASE_URL")
			.or_else(|| get("PUBLIC_DATABASE_HOST"))
			.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

		let ns = get("PUBLIC_DATABASE_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
		let db = get("PUBLIC_DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string());

		let credentials = match (get("DATABASE_USER"), get("DATABASE_PASSWORD")) {
			(Some(user), Some(pass)) => Some(Credentials { user, pass }),
			(None, None) => None,
			_ => bail!("DATABASE_USER and DATABASE_PASSWORD must be set together"),
		};

		Ok(Self {
			url,
			ns,
			db,
			credentials,
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn ns(&self) -> &str {
		&self.ns
	}

	pub fn db(&self) -> &str {
		&self.db
	}

	pub fn credentials(&self) -> Option<&Credentials> {
		self.credentials.as_ref()
	}
}

/// Input locations for a seed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCfg {
	pub taxonomy_file: PathBuf,
	pub pillars_file: PathBuf,
}

impl SeedCfg {
	pub fn from_env(env: &DotEnv, file: Option<PathBuf>) -> Self {
		Self::from_lookup(|key| env.get_var(key.to_string()), file)
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, file: Option<PathBuf>) -> Self {
		let taxonomy_file = file
			.or_else(|| {
				lookup("TAXONOMY_FILE")
					.filter(|v| !v.trim().is_empty())
					.map(PathBuf::from)
			})
			.unwrap_or_else(|| PathBuf::from(DEFAULT_TAXONOMY_FILE));

		Self {
			taxonomy_file,
			pillars_file: PathBuf::from(PILLARS_FILE),
		}
	}
}

pub async fn connect(cfg: &DbCfg) -> Result<Surreal<Any>> {
	let db = create_surreal_client(cfg.url())
		.await
		.with_context(|| format!("Failed connecting to {}", cfg.url()))?;

	match cfg.credentials() {
		Some(creds) => {
			db.signin(Root {
				username: creds.user.clone(),
				password: creds.pass.clone(),
			})
			.await
			.context("signin failed")?;
		}
		None => debug!("no credentials configured, skipping signin"),
	}

	db.use_ns(cfg.ns())
		.use_db(cfg.db())
		.await
		.with_context(|| format!("use_ns/use_db failed for ns={} db={}", cfg.ns(), cfg.db()))?;

	debug!(url = cfg.url(), ns = cfg.ns(), db = cfg.db(), "connected");
	Ok(db)
}
