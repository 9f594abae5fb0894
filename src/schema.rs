use anyhow::{Context, Result};
use surrealdb::{Surreal, engine::any::Any};

use crate::core::exec_surql;

pub async fn run_setup(db: &Surreal<Any>) -> Result<()> {
	exec_surql(db, SCHEMA).await.context("defining taxonomy schema")
}

/// The schema with `IF NOT EXISTS` in place of `OVERWRITE`.
///
/// Redefining the unique `by_code` index in the same transaction that deletes
/// and recreates pillars makes the commit fail with a write conflict, so the
/// seed transaction only creates what is missing. `esgkit setup` refreshes
/// existing definitions.
pub fn schema_if_missing() -> String {
	SCHEMA.replace(" OVERWRITE ", " IF NOT EXISTS ")
}

/// Taxonomy tables. Children reference their parent with `ON DELETE CASCADE`,
/// so removing a pillar removes its whole subtree.
pub const SCHEMA: &str = r#"
DEFINE TABLE OVERWRITE pillar SCHEMAFULL
	PERMISSIONS NONE;

DEFINE FIELD OVERWRITE code ON pillar
	TYPE string
	ASSERT string::len($value) > 0;

DEFINE FIELD OVERWRITE name ON pillar
	TYPE string;

DEFINE FIELD OVERWRITE description ON pillar
	TYPE option<string>;

DEFINE FIELD OVERWRITE icon ON pillar
	TYPE option<string>;

DEFINE FIELD OVERWRITE color ON pillar
	TYPE option<string>;

DEFINE INDEX OVERWRITE by_code ON pillar
	FIELDS code
	UNIQUE;

DEFINE TABLE OVERWRITE theme SCHEMAFULL
	PERMISSIONS NONE;

DEFINE FIELD OVERWRITE pillar ON theme
	TYPE record<pillar>
	REFERENCE ON DELETE CASCADE;

DEFINE FIELD OVERWRITE name ON theme
	TYPE string;

DEFINE FIELD OVERWRITE order_index ON theme
	TYPE int;

DEFINE TABLE OVERWRITE criterion SCHEMAFULL
	PERMISSIONS NONE;

DEFINE FIELD OVERWRITE theme ON criterion
	TYPE record<theme>
	REFERENCE ON DELETE CASCADE;

DEFINE FIELD OVERWRITE name ON criterion
	TYPE string;

DEFINE FIELD OVERWRITE order_index ON criterion
	TYPE int;

DEFINE TABLE OVERWRITE assessment_item SCHEMAFULL
	PERMISSIONS NONE;

DEFINE FIELD OVERWRITE criterion ON assessment_item
	TYPE record<criterion>
	REFERENCE ON DELETE CASCADE;

DEFINE FIELD OVERWRITE question ON assessment_item
	TYPE string;

DEFINE FIELD OVERWRITE order_index ON assessment_item
	TYPE int;

DEFINE TABLE OVERWRITE _seed_run SCHEMAFULL
	PERMISSIONS NONE;

DEFINE FIELD OVERWRITE file ON _seed_run
	TYPE string;

DEFINE FIELD OVERWRITE hash ON _seed_run
	TYPE string;

DEFINE FIELD OVERWRITE questions ON _seed_run
	TYPE int;

DEFINE FIELD OVERWRITE seeded_at ON _seed_run
	TYPE datetime;
"#;
