use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::{display, sha256_hex};

/// One flat row of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionEntry {
	pub theme: String,
	pub criteria: String,
	pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PillarQuestions {
	#[serde(default)]
	pub name: Option<String>,
	pub questions: Vec<QuestionEntry>,
}

/// Source document keyed by pillar code.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyDocument {
	pub pillars: BTreeMap<String, PillarQuestions>,
}

impl TaxonomyDocument {
	pub fn question_count(&self) -> usize {
		self.pillars.values().map(|p| p.questions.len()).sum()
	}
}

/// A parsed document together with the digest of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
	pub path: String,
	pub hash: String,
	pub document: TaxonomyDocument,
}

pub fn load_document(path: &Path) -> Result<LoadedDocument> {
	if !path.exists() {
		return Err(anyhow!("taxonomy file not found: {}", display(path)));
	}

	let raw = fs::read_to_string(path).with_context(|| format!("reading {}", display(path)))?;
	let document = parse_document(&raw).with_context(|| format!("parsing {}", display(path)))?;
	Ok(LoadedDocument {
		path: display(path),
		hash: sha256_hex(raw.as_bytes()),
		document,
	})
}

pub fn parse_document(raw: &str) -> Result<TaxonomyDocument> {
	Ok(serde_json::from_str(raw)?)
}
