use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use surrealdb::{Surreal, engine::any::Any};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info};

use crate::config::{DbCfg, SeedCfg, connect};
use crate::hierarchy::{SeedPlan, plan_document};
use crate::pillars::{PillarDef, load_pillars};
use crate::report::{self, PillarReport, SeedReport};
use crate::schema::schema_if_missing;
use crate::status::{SeedRun, Verification, verify};
use crate::taxonomy::load_document;

#[derive(Debug, Clone)]
pub struct SeedOpts {
	pub dry_run: bool,
	pub json_out: Option<PathBuf>,
}

/// Loads, plans and replaces the whole taxonomy, then checks what landed.
///
/// Input problems surface before the connection is opened; database problems
/// cancel the single transaction in [`replace_taxonomy`].
pub async fn seed(db_cfg: &DbCfg, cfg: &SeedCfg, opts: &SeedOpts) -> Result<()> {
	let started_at = OffsetDateTime::now_utc();
	let run_start = Instant::now();

	let pillars = load_pillars(&cfg.pillars_file)?;
	let loaded = load_document(&cfg.taxonomy_file)?;
	let plan = plan_document(&loaded.document, &pillars)?;
	debug!(
		file = %loaded.path,
		hash = %loaded.hash,
		entries = loaded.document.question_count(),
		"taxonomy loaded"
	);

	for p in &plan.pillars {
		let stats = p.stats();
		println!(
			"pillar {} ({}): {} questions, {} themes, {} criteria",
			p.code, p.label, stats.questions, stats.themes, stats.criteria
		);
	}

	if opts.dry_run {
		println!(
			"DRY RUN: would replace {} pillars and {} questions from {}",
			pillars.len(),
			plan.totals().questions,
			loaded.path
		);
		return Ok(());
	}

	let db = connect(db_cfg).await?;

	let run = SeedRun {
		file: loaded.path.clone(),
		hash: loaded.hash.clone(),
		questions: plan.totals().questions as i64,
		seeded_at: started_at.format(&Rfc3339)?,
	};
	replace_taxonomy(&db, &plan, &pillars, &run).await?;
	info!(questions = run.questions, "taxonomy replaced");

	let verification = verify(&db).await?;
	ensure_matches_plan(&plan, pillars.len(), &verification)?;

	let seed_report = SeedReport {
		started_at: run.seeded_at.clone(),
		finished_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
		duration_ms: run_start.elapsed().as_millis(),
		file: run.file,
		hash: run.hash,
		pillars: plan
			.pillars
			.iter()
			.map(|p| PillarReport {
				code: p.code.clone(),
				label: p.label.clone(),
				stats: p.stats(),
			})
			.collect(),
		verification,
	};

	report::print_human_report(&seed_report);
	if let Some(path) = &opts.json_out {
		report::write_json_report(path, &seed_report)?;
	}
	Ok(())
}

/// Clears every pillar (descendants follow by cascade) and writes the plan
/// back, all inside one transaction.
///
/// Each `CREATE` yields the generated record id that the next level down
/// links to. A failing statement cancels the transaction and nothing from
/// this run is committed.
pub async fn replace_taxonomy(
	db: &Surreal<Any>,
	plan: &SeedPlan,
	pillars: &[PillarDef],
	run: &SeedRun,
) -> Result<()> {
	let sql = render_replace_sql();
	db.query(sql)
		.bind(("pillars", serde_json::to_value(pillars)?))
		.bind(("plan", serde_json::to_value(plan)?))
		.bind(("run", serde_json::to_value(run)?))
		.await?
		.check()
		.context("replacing taxonomy")?;
	Ok(())
}

pub fn render_replace_sql() -> String {
	format!(
		"BEGIN TRANSACTION;\n{}\n{REPLACE_SQL}\nCOMMIT TRANSACTION;\n",
		schema_if_missing()
	)
}

const REPLACE_SQL: &str = r#"
DELETE pillar;

FOR $p IN $pillars {
	CREATE pillar CONTENT $p;
};

FOR $group IN $plan {
	LET $pillar = (SELECT VALUE id FROM ONLY pillar WHERE code = $group.code LIMIT 1);
	IF !$pillar {
		THROW "unknown pillar code: " + $group.code;
	};

	FOR $theme IN $group.themes {
		LET $theme_id = (CREATE ONLY theme CONTENT {
			pillar: $pillar,
			name: $theme.name,
			order_index: $theme.order_index
		}).id;

		FOR $criterion IN $theme.criteria {
			LET $criterion_id = (CREATE ONLY criterion CONTENT {
				theme: $theme_id,
				name: $criterion.name,
				order_index: $criterion.order_index
			}).id;

			FOR $item IN $criterion.items {
				CREATE assessment_item CONTENT {
					criterion: $criterion_id,
					question: $item.question,
					order_index: $item.order_index
				};
			};
		};
	};
};

CREATE _seed_run CONTENT {
	file: $run.file,
	hash: $run.hash,
	questions: $run.questions,
	seeded_at: <datetime> $run.seeded_at
};
"#;

fn ensure_matches_plan(plan: &SeedPlan, pillar_count: usize, v: &Verification) -> Result<()> {
	let totals = plan.totals();
	if v.pillars != pillar_count {
		bail!("expected {} pillars after seed, found {}", pillar_count, v.pillars);
	}
	if (v.themes, v.criteria, v.questions) != (totals.themes, totals.criteria, totals.questions) {
		bail!(
			"persisted counts differ from input: themes {}/{}, criteria {}/{}, questions {}/{}",
			v.themes,
			totals.themes,
			v.criteria,
			totals.criteria,
			v.questions,
			totals.questions
		);
	}

	for p in &plan.pillars {
		let expected = p.stats().questions;
		let found = v
			.breakdown
			.iter()
			.find(|b| b.code == p.code)
			.map(|b| b.questions)
			.unwrap_or(0);
		if found != expected {
			bail!(
				"pillar {}: expected {} questions after seed, found {}",
				p.code,
				expected,
				found
			);
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::core::{create_surreal_client, exec_surql};
	use crate::hierarchy::{PillarPlan, group_questions};
	use crate::pillars::default_pillars;
	use crate::schema::run_setup;
	use crate::status::{PillarBreakdown, last_seed_run};
	use crate::taxonomy::{QuestionEntry, parse_document};

	fn sample_plan() -> SeedPlan {
		let doc = parse_document(
			r#"{"E": {"questions": [
				{"theme": "Climate", "criteria": "Emissions", "question": "Q1"},
				{"theme": "Climate", "criteria": "Emissions", "question": "Q2"}
			]}}"#,
		)
		.expect("valid document");
		plan_document(&doc, &default_pillars()).expect("known codes")
	}

	fn verification(questions: usize) -> Verification {
		Verification {
			pillars: 3,
			themes: 1,
			criteria: 1,
			questions,
			breakdown: vec![PillarBreakdown {
				code: "E".to_string(),
				name: "Ambiental".to_string(),
				themes: 1,
				criteria: 1,
				questions,
			}],
		}
	}

	#[test]
	fn replace_sql_is_a_single_transaction() {
		let sql = render_replace_sql();
		assert!(sql.starts_with("BEGIN TRANSACTION;"));
		assert!(sql.trim_end().ends_with("COMMIT TRANSACTION;"));
		assert_eq!(sql.matches("BEGIN TRANSACTION;").count(), 1);
		assert_eq!(sql.matches("COMMIT TRANSACTION;").count(), 1);
	}

	#[test]
	fn replace_sql_defines_schema_before_clearing() {
		let sql = render_replace_sql();
		let define = sql.find("DEFINE TABLE IF NOT EXISTS pillar").expect("schema present");
		let clear = sql.find("DELETE pillar;").expect("clear present");
		let insert = sql.find("CREATE pillar CONTENT $p;").expect("insert present");
		assert!(define < clear && clear < insert);
	}

	#[test]
	fn replace_sql_keeps_existing_definitions() {
		let sql = render_replace_sql();
		assert!(!sql.contains("OVERWRITE"));
		assert!(!sql.contains("DELETE _seed_run"));
	}

	#[test]
	fn replace_sql_links_each_level_to_its_parent() {
		let sql = render_replace_sql();
		assert!(sql.contains("pillar: $pillar,"));
		assert!(sql.contains("theme: $theme_id,"));
		assert!(sql.contains("criterion: $criterion_id,"));
	}

	#[test]
	fn bound_pillars_omit_missing_optionals() {
		let mut pillars = default_pillars();
		pillars[0].icon = None;
		let value = serde_json::to_value(&pillars).expect("serializable");
		assert!(value[0].get("icon").is_none());
		assert_eq!(value[1]["icon"], "users");
	}

	#[test]
	fn matching_counts_pass() {
		ensure_matches_plan(&sample_plan(), 3, &verification(2)).expect("counts match");
	}

	#[test]
	fn missing_questions_fail() {
		let err = ensure_matches_plan(&sample_plan(), 3, &verification(1)).expect_err("short");
		assert!(err.to_string().contains("persisted counts differ"));
	}

	#[test]
	fn missing_pillars_fail() {
		let mut v = verification(2);
		v.pillars = 2;
		assert!(ensure_matches_plan(&sample_plan(), 3, &v).is_err());
	}

	const MIXED: &str = r#"{
		"E": {"questions": [
			{"theme": "Water", "criteria": "Use", "question": "W1"},
			{"theme": "Climate", "criteria": "Emissions", "question": "C1"},
			{"theme": "Water", "criteria": "Discharge", "question": "W2"},
			{"theme": "Water", "criteria": "Use", "question": "W3"}
		]},
		"G": {"questions": [
			{"theme": "Ethics", "criteria": "Code", "question": "G1"}
		]}
	}"#;

	async fn memory_db() -> Surreal<Any> {
		let db = create_surreal_client("mem://").await.expect("in-memory engine");
		db.use_ns("test").use_db("test").await.expect("select ns/db");
		db
	}

	fn mixed_plan() -> SeedPlan {
		let doc = parse_document(MIXED).expect("valid document");
		plan_document(&doc, &default_pillars()).expect("known codes")
	}

	fn ledger(seeded_at: &str, questions: i64) -> SeedRun {
		SeedRun {
			file: "esg_questions_complete.json".to_string(),
			hash: format!("hash-{seeded_at}"),
			questions,
			seeded_at: seeded_at.to_string(),
		}
	}

	#[tokio::test]
	async fn seed_persists_every_question() {
		let db = memory_db().await;
		let pillars = default_pillars();
		let plan = mixed_plan();

		replace_taxonomy(&db, &plan, &pillars, &ledger("2024-01-01T00:00:00Z", 5))
			.await
			.expect("seed succeeds");

		let v = verify(&db).await.expect("verify");
		assert_eq!((v.pillars, v.themes, v.criteria, v.questions), (3, 3, 4, 5));
		ensure_matches_plan(&plan, pillars.len(), &v).expect("counts match the plan");

		let e = v.breakdown.iter().find(|b| b.code == "E").expect("E present");
		assert_eq!((e.themes, e.criteria, e.questions), (2, 3, 4));
		let s = v.breakdown.iter().find(|b| b.code == "S").expect("S present");
		assert_eq!(s.questions, 0);
	}

	#[tokio::test]
	async fn reseeding_same_input_keeps_counts() {
		let db = memory_db().await;
		let pillars = default_pillars();
		let plan = mixed_plan();

		replace_taxonomy(&db, &plan, &pillars, &ledger("2024-01-01T00:00:00Z", 5))
			.await
			.expect("first seed");
		let first = verify(&db).await.expect("verify first");

		replace_taxonomy(&db, &plan, &pillars, &ledger("2024-01-02T00:00:00Z", 5))
			.await
			.expect("second seed on populated database");
		let second = verify(&db).await.expect("verify second");

		assert_eq!(first, second);

		let run = last_seed_run(&db).await.expect("ledger").expect("run recorded");
		assert_eq!(run.hash, "hash-2024-01-02T00:00:00Z");
		assert!(run.seeded_at.starts_with("2024-01-02"));
	}

	#[tokio::test]
	async fn unknown_pillar_aborts_without_changes() {
		let db = memory_db().await;
		let pillars = default_pillars();
		replace_taxonomy(&db, &mixed_plan(), &pillars, &ledger("2024-01-01T00:00:00Z", 5))
			.await
			.expect("first seed");
		let before = verify(&db).await.expect("verify before");

		let bad = SeedPlan {
			pillars: vec![PillarPlan {
				code: "X".to_string(),
				label: "Unknown".to_string(),
				themes: group_questions(&[QuestionEntry {
					theme: "t".to_string(),
					criteria: "c".to_string(),
					question: "q".to_string(),
				}]),
			}],
		};
		let err = replace_taxonomy(&db, &bad, &pillars, &ledger("2024-01-02T00:00:00Z", 1))
			.await
			.expect_err("unknown code must fail");
		assert!(format!("{err:#}").contains("replacing taxonomy"));

		assert_eq!(verify(&db).await.expect("verify after"), before);
		let run = last_seed_run(&db).await.expect("ledger").expect("run recorded");
		assert_eq!(run.questions, 5);
	}

	#[tokio::test]
	async fn deleting_a_pillar_removes_its_subtree() {
		let db = memory_db().await;
		replace_taxonomy(&db, &mixed_plan(), &default_pillars(), &ledger("2024-01-01T00:00:00Z", 5))
			.await
			.expect("seed");

		exec_surql(&db, "DELETE pillar WHERE code = 'E';").await.expect("delete E");

		let v = verify(&db).await.expect("verify");
		assert_eq!((v.pillars, v.themes, v.criteria, v.questions), (2, 1, 1, 1));
		assert!(v.breakdown.iter().all(|b| b.code != "E"));
	}

	#[tokio::test]
	async fn persisted_order_follows_first_appearance() {
		let db = memory_db().await;
		replace_taxonomy(&db, &mixed_plan(), &default_pillars(), &ledger("2024-01-01T00:00:00Z", 5))
			.await
			.expect("seed");

		let mut resp = db
			.query(
				"SELECT name, order_index FROM theme WHERE pillar.code = 'E' ORDER BY order_index;
				SELECT name, order_index FROM criterion WHERE theme.name = 'Water' ORDER BY order_index;
				SELECT question, order_index FROM assessment_item WHERE criterion.name = 'Use' ORDER BY order_index;",
			)
			.await
			.expect("query")
			.check()
			.expect("no statement errors");

		let themes: Vec<serde_json::Value> = resp.take(0).expect("themes");
		let criteria: Vec<serde_json::Value> = resp.take(1).expect("criteria");
		let items: Vec<serde_json::Value> = resp.take(2).expect("items");

		assert_eq!(
			themes,
			vec![
				json!({"name": "Water", "order_index": 1}),
				json!({"name": "Climate", "order_index": 2}),
			]
		);
		assert_eq!(
			criteria,
			vec![
				json!({"name": "Use", "order_index": 1}),
				json!({"name": "Discharge", "order_index": 2}),
			]
		);
		assert_eq!(
			items,
			vec![
				json!({"question": "W1", "order_index": 1}),
				json!({"question": "W3", "order_index": 2}),
			]
		);
	}

	#[tokio::test]
	async fn ledger_is_empty_before_first_seed() {
		let db = memory_db().await;
		run_setup(&db).await.expect("setup");
		assert!(last_seed_run(&db).await.expect("ledger").is_none());
		assert_eq!(verify(&db).await.expect("verify"), Verification::default());
	}
}
