use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::hierarchy::{PlanStats, SeedPlan};
use crate::status::{Verification, print_verification};

#[derive(Debug, Clone, Serialize)]
pub struct PillarReport {
	pub code: String,
	pub label: String,
	#[serde(flatten)]
	pub stats: PlanStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
	pub started_at: String,
	pub finished_at: String,
	pub duration_ms: u128,
	pub file: String,
	pub hash: String,
	pub pillars: Vec<PillarReport>,
	pub verification: Verification,
}

pub fn print_human_report(report: &SeedReport) {
	println!("Seed summary:");
	println!("  file: {} ({})", report.file, report.hash);
	for p in &report.pillars {
		println!(
			"  pillar {}: {} questions inserted",
			p.code, p.stats.questions
		);
	}
	println!(
		"  total: {} questions inserted",
		report.pillars.iter().map(|p| p.stats.questions).sum::<usize>()
	);
	println!("  duration_ms: {}", report.duration_ms);
	print_verification(&report.verification);
}

pub fn write_json_report(path: &Path, report: &SeedReport) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)
			.with_context(|| format!("creating report directory {}", parent.display()))?;
	}
	let raw = serde_json::to_string_pretty(report).context("serializing report json")?;
	fs::write(path, format!("{raw}\n"))
		.with_context(|| format!("writing report file {}", path.display()))?;
	Ok(())
}

/// Indented outline of a plan, one line per theme, criterion and question.
pub fn render_plan(plan: &SeedPlan) -> String {
	let mut out = String::new();
	for p in &plan.pillars {
		let stats = p.stats();
		out.push_str(&format!(
			"{} {} ({} themes, {} criteria, {} questions)\n",
			p.code, p.label, stats.themes, stats.criteria, stats.questions
		));
		for theme in &p.themes {
			out.push_str(&format!("  {}. {}\n", theme.order_index, theme.name));
			for criterion in &theme.criteria {
				out.push_str(&format!(
					"    {}.{}. {}\n",
					theme.order_index, criterion.order_index, criterion.name
				));
				for item in &criterion.items {
					out.push_str(&format!(
						"      {}.{}.{}. {}\n",
						theme.order_index, criterion.order_index, item.order_index, item.question
					));
				}
			}
		}
	}
	out
}
