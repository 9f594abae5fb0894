use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use surrealdb::{Surreal, engine::any::Any};
use surrealdb_types::SurrealValue;

use crate::core::{display, sha256_hex};

/// One `_seed_run` ledger row; every successful replace appends one.
#[derive(serde::Deserialize, Serialize, Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct SeedRun {
	pub file: String,
	pub hash: String,
	pub questions: i64,
	pub seeded_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PillarBreakdown {
	pub code: String,
	pub name: String,
	pub themes: usize,
	pub criteria: usize,
	pub questions: usize,
}

/// Row counts as persisted, with a left-joined per-pillar breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
	pub pillars: usize,
	pub themes: usize,
	pub criteria: usize,
	pub questions: usize,
	pub breakdown: Vec<PillarBreakdown>,
}

const VERIFY_SQL: &str = "
SELECT count() AS total FROM pillar GROUP ALL;
SELECT count() AS total FROM theme GROUP ALL;
SELECT count() AS total FROM criterion GROUP ALL;
SELECT count() AS total FROM assessment_item GROUP ALL;
SELECT code, name FROM pillar ORDER BY code;
SELECT pillar.code AS code, count() AS total FROM theme GROUP BY code;
SELECT theme.pillar.code AS code, count() AS total FROM criterion GROUP BY code;
SELECT criterion.theme.pillar.code AS code, count() AS total FROM assessment_item GROUP BY code;
";

pub async fn verify(db: &Surreal<Any>) -> Result<Verification> {
	let mut resp = db.query(VERIFY_SQL).await?.check()?;

	let pillars: Option<Value> = resp.take(0)?;
	let themes: Option<Value> = resp.take(1)?;
	let criteria: Option<Value> = resp.take(2)?;
	let questions: Option<Value> = resp.take(3)?;
	let pillar_rows: Vec<Value> = resp.take(4)?;
	let themes_by_code: Vec<Value> = resp.take(5)?;
	let criteria_by_code: Vec<Value> = resp.take(6)?;
	let questions_by_code: Vec<Value> = resp.take(7)?;

	Ok(Verification {
		pillars: total_of(pillars.as_ref()),
		themes: total_of(themes.as_ref()),
		criteria: total_of(criteria.as_ref()),
		questions: total_of(questions.as_ref()),
		breakdown: breakdown(
			&pillar_rows,
			&totals_by_code(&themes_by_code),
			&totals_by_code(&criteria_by_code),
			&totals_by_code(&questions_by_code),
		),
	})
}

const LAST_RUN_SQL: &str = "
SELECT file, hash, questions, <string> seeded_at AS seeded_at
FROM (SELECT * FROM _seed_run ORDER BY seeded_at DESC LIMIT 1);
";

pub async fn last_seed_run(db: &Surreal<Any>) -> Result<Option<SeedRun>> {
	let mut resp = db.query(LAST_RUN_SQL).await?.check()?;
	let rows: Vec<SeedRun> = resp.take(0)?;
	Ok(rows.into_iter().next())
}

pub async fn status(db: &Surreal<Any>, taxonomy_file: &Path) -> Result<()> {
	let verification = verify(db).await?;
	print_verification(&verification);

	match last_seed_run(db).await? {
		None => println!("No seed run recorded"),
		Some(run) => {
			println!(
				"Last seed: {} {} ({} questions) at {}",
				run.file, run.hash, run.questions, run.seeded_at
			);
			if taxonomy_file.exists() {
				let current = sha256_hex(&fs::read(taxonomy_file)?);
				if current == run.hash {
					println!("{} matches the last seed", display(taxonomy_file));
				} else {
					println!(
						"{} changed since the last seed; rerun `esgkit seed` to apply it",
						display(taxonomy_file)
					);
				}
			}
		}
	}
	Ok(())
}

pub fn print_verification(v: &Verification) {
	println!("Persisted taxonomy:");
	println!("  pillars: {}", v.pillars);
	println!("  themes: {}", v.themes);
	println!("  criteria: {}", v.criteria);
	println!("  questions: {}", v.questions);
	if v.breakdown.is_empty() {
		return;
	}
	println!("By pillar:");
	for p in &v.breakdown {
		println!(
			"  {} ({}): {} questions, {} themes, {} criteria",
			p.code, p.name, p.questions, p.themes, p.criteria
		);
	}
}

fn total_of(row: Option<&Value>) -> usize {
	row.and_then(|v| v.get("total"))
		.and_then(Value::as_u64)
		.unwrap_or(0) as usize
}

fn totals_by_code(rows: &[Value]) -> BTreeMap<String, usize> {
	let mut out = BTreeMap::new();
	for row in rows {
		if let Some(code) = row.get("code").and_then(Value::as_str) {
			*out.entry(code.to_string()).or_default() += total_of(Some(row));
		}
	}
	out
}

fn breakdown(
	pillar_rows: &[Value],
	themes: &BTreeMap<String, usize>,
	criteria: &BTreeMap<String, usize>,
	questions: &BTreeMap<String, usize>,
) -> Vec<PillarBreakdown> {
	pillar_rows
		.iter()
		.filter_map(|row| {
			let code = row.get("code").and_then(Value::as_str)?;
			let name = row.get("name").and_then(Value::as_str).unwrap_or_default();
			Some(PillarBreakdown {
				code: code.to_string(),
				name: name.to_string(),
				themes: themes.get(code).copied().unwrap_or(0),
				criteria: criteria.get(code).copied().unwrap_or(0),
				questions: questions.get(code).copied().unwrap_or(0),
			})
		})
		.collect()
}
