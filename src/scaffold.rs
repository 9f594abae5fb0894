use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::config::PILLARS_FILE;
use crate::pillars::{default_pillars, render_pillars};

pub fn scaffold() -> Result<()> {
	let pillars_path = Path::new(PILLARS_FILE);
	if let Some(parent) = pillars_path.parent() {
		fs::create_dir_all(parent).context("creating database")?;
	}

	if pillars_path.exists() {
		println!("{} already exists, leaving it untouched", PILLARS_FILE);
		return Ok(());
	}

	let body = render_pillars(&default_pillars())?;
	fs::write(pillars_path, format!("{PILLARS_HEADER}{body}"))
		.with_context(|| format!("writing {}", PILLARS_FILE))?;

	println!("Scaffolded {} with the E, S and G pillars", PILLARS_FILE);
	Ok(())
}

const PILLARS_HEADER: &str = "# Pillars inserted on every `esgkit seed`, in file order.
# Taxonomy keys must match one of these codes.

";

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pillars::parse_pillars;

	#[test]
	fn scaffolded_file_parses_to_defaults() {
		let body = render_pillars(&default_pillars()).expect("render");
		let parsed = parse_pillars(&format!("{PILLARS_HEADER}{body}")).expect("parse");
		assert_eq!(parsed, default_pillars());
	}
}
