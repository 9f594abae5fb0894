use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::display;

/// A top-level ESG category. Pillars are inserted in list order on every seed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PillarDef {
	pub code: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PillarsFile {
	#[serde(default, rename = "pillar")]
	pillars: Vec<PillarDef>,
}

pub fn default_pillars() -> Vec<PillarDef> {
	vec![
		pillar(
			"E",
			"Ambiental",
			"Avalie impactos ambientais, gestão de recursos naturais, emissões de carbono e estratégias de sustentabilidade",
			"leaf",
			"#2D5F4F",
		),
		pillar(
			"S",
			"Social",
			"Analise práticas de diversidade e inclusão, condições de trabalho, relacionamento com comunidade e responsabilidade social",
			"users",
			"#8B4636",
		),
		pillar(
			"G",
			"Governança",
			"Examine estruturas de governança corporativa, transparência, ética empresarial, compliance e gestão de riscos",
			"briefcase",
			"#D4A574",
		),
	]
}

fn pillar(code: &str, name: &str, description: &str, icon: &str, color: &str) -> PillarDef {
	PillarDef {
		code: code.to_string(),
		name: name.to_string(),
		description: Some(description.to_string()),
		icon: Some(icon.to_string()),
		color: Some(color.to_string()),
	}
}

/// Reads the pillar set from `path`, or the built-in defaults when the file is absent.
pub fn load_pillars(path: &Path) -> Result<Vec<PillarDef>> {
	if !path.exists() {
		return Ok(default_pillars());
	}

	let raw = fs::read_to_string(path).with_context(|| format!("reading {}", display(path)))?;
	parse_pillars(&raw).with_context(|| format!("parsing {}", display(path)))
}

pub fn parse_pillars(raw: &str) -> Result<Vec<PillarDef>> {
	let file: PillarsFile = toml::from_str(raw)?;
	if file.pillars.is_empty() {
		bail!("no [[pillar]] entries defined");
	}

	let mut seen = BTreeSet::new();
	for p in &file.pillars {
		if p.code.trim().is_empty() {
			bail!("pillar '{}' has an empty code", p.name);
		}
		if !seen.insert(p.code.as_str()) {
			bail!("duplicate pillar code '{}'", p.code);
		}
	}

	Ok(file.pillars)
}

pub fn render_pillars(pillars: &[PillarDef]) -> Result<String> {
	let file = PillarsFile {
		pillars: pillars.to_vec(),
	};
	Ok(toml::to_string_pretty(&file)?)
}
