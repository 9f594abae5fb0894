//! Flat question rows → pillar / theme / criterion / item hierarchy.
//!
//! Sibling `order_index` values are 1-based and follow first appearance in the
//! source rows. Repeated (theme, criterion) pairs collapse into one group no
//! matter what appears between them.

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::pillars::PillarDef;
use crate::taxonomy::{QuestionEntry, TaxonomyDocument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
	pub question: String,
	pub order_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionGroup {
	pub name: String,
	pub order_index: u32,
	pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeGroup {
	pub name: String,
	pub order_index: u32,
	pub criteria: Vec<CriterionGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PillarPlan {
	pub code: String,
	#[serde(skip)]
	pub label: String,
	pub themes: Vec<ThemeGroup>,
}

impl PillarPlan {
	pub fn stats(&self) -> PlanStats {
		let criteria = self.themes.iter().map(|t| t.criteria.len()).sum();
		let questions = self
			.themes
			.iter()
			.flat_map(|t| &t.criteria)
			.map(|c| c.items.len())
			.sum();
		PlanStats {
			themes: self.themes.len(),
			criteria,
			questions,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
	pub themes: usize,
	pub criteria: usize,
	pub questions: usize,
}

impl std::ops::Add for PlanStats {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self {
			themes: self.themes + rhs.themes,
			criteria: self.criteria + rhs.criteria,
			questions: self.questions + rhs.questions,
		}
	}
}

/// Everything one seed run writes below the pillar level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeedPlan {
	pub pillars: Vec<PillarPlan>,
}

impl SeedPlan {
	pub fn totals(&self) -> PlanStats {
		self.pillars
			.iter()
			.map(PillarPlan::stats)
			.fold(PlanStats::default(), |acc, s| acc + s)
	}
}

/// Insertion-ordered groups keyed by name.
struct Ordered<V> {
	index: HashMap<String, usize>,
	entries: Vec<(String, V)>,
}

impl<V> Default for Ordered<V> {
	fn default() -> Self {
		Self {
			index: HashMap::new(),
			entries: Vec::new(),
		}
	}
}

impl<V: Default> Ordered<V> {
	fn entry(&mut self, key: &str) -> &mut V {
		let pos = match self.index.get(key) {
			Some(&pos) => pos,
			None => {
				self.entries.push((key.to_string(), V::default()));
				let pos = self.entries.len() - 1;
				self.index.insert(key.to_string(), pos);
				pos
			}
		};
		&mut self.entries[pos].1
	}

	fn into_entries(self) -> Vec<(String, V)> {
		self.entries
	}
}

pub fn group_questions(entries: &[QuestionEntry]) -> Vec<ThemeGroup> {
	let mut themes: Ordered<Ordered<Vec<String>>> = Ordered::default();
	for entry in entries {
		themes
			.entry(&entry.theme)
			.entry(&entry.criteria)
			.push(entry.question.clone());
	}

	themes
		.into_entries()
		.into_iter()
		.zip(1..)
		.map(|((name, criteria), order_index)| ThemeGroup {
			name,
			order_index,
			criteria: criteria
				.into_entries()
				.into_iter()
				.zip(1..)
				.map(|((name, questions), order_index)| CriterionGroup {
					name,
					order_index,
					items: questions
						.into_iter()
						.zip(1..)
						.map(|(question, order_index)| Item {
							question,
							order_index,
						})
						.collect(),
				})
				.collect(),
		})
		.collect()
}

/// Groups every pillar of `document`, following the order of `pillars`.
///
/// Fails before producing anything if the document names a pillar code that
/// is not configured; pillars are never created on the fly.
pub fn plan_document(document: &TaxonomyDocument, pillars: &[PillarDef]) -> Result<SeedPlan> {
	let unknown: Vec<&str> = document
		.pillars
		.keys()
		.filter(|code| !pillars.iter().any(|p| &p.code == *code))
		.map(String::as_str)
		.collect();
	if !unknown.is_empty() {
		bail!("unknown pillar code(s) in taxonomy: {}", unknown.join(", "));
	}

	let plans = pillars
		.iter()
		.filter_map(|p| {
			document.pillars.get(&p.code).map(|data| PillarPlan {
				code: p.code.clone(),
				label: data.name.clone().unwrap_or_else(|| p.name.clone()),
				themes: group_questions(&data.questions),
			})
		})
		.collect();

	Ok(SeedPlan { pillars: plans })
}
