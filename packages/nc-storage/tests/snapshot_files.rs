use std::{collections::BTreeMap, fs, path::PathBuf};

use time::macros::datetime;

use nc_config::Storage;
use nc_storage::{
	SnapshotStore,
	models::{NarrativeSnapshot, PheromoneRecord, PheromoneSnapshot},
};

fn storage(backend: &str, state_dir: PathBuf) -> Storage {
	Storage {
		backend: backend.to_string(),
		state_dir,
		pheromone_file: "pheromones.json".to_string(),
		narrative_file: "narrative.json".to_string(),
	}
}

#[test]
fn pheromone_file_is_keyed_by_document_id() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = storage("json", dir.path().to_path_buf());
	let stores = nc_storage::open(&cfg);
	let mut records = BTreeMap::new();

	records.insert("doc-a".to_string(), PheromoneRecord {
		value: 0.75,
		last_update: datetime!(2026-01-02 03:04:05 UTC),
		exposures: 2.0,
	});

	stores.pheromone.save(&PheromoneSnapshot { records }).expect("Save failed.");

	let raw = fs::read_to_string(cfg.pheromone_path()).expect("File must exist.");
	let json: serde_json::Value = serde_json::from_str(&raw).expect("File must be JSON.");

	assert_eq!(json["doc-a"]["value"], 0.75);
	assert_eq!(json["doc-a"]["exposures"], 2.0);
	assert_eq!(json["doc-a"]["last_update"], "2026-01-02T03:04:05Z");
}

#[test]
fn narrative_file_holds_vector_and_optional_timestamp() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = storage("json", dir.path().to_path_buf());

	fs::write(cfg.narrative_path(), r#"{"vector":[0.6,0.8]}"#).expect("Failed to seed file.");

	let stores = nc_storage::open(&cfg);
	let loaded = stores.narrative.load().expect("Legacy file must load.");

	assert_eq!(loaded, Some(NarrativeSnapshot { vector: vec![0.6, 0.8], updated_at: None }));
}

#[test]
fn schema_mismatch_is_an_error_not_a_panic() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = storage("json", dir.path().to_path_buf());

	fs::write(cfg.pheromone_path(), r#"["not", "a", "map"]"#).expect("Failed to seed file.");

	let stores = nc_storage::open(&cfg);

	assert!(stores.pheromone.load().is_err());
}

#[test]
fn memory_backend_never_touches_disk() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let cfg = storage("memory", dir.path().join("unused"));
	let stores = nc_storage::open(&cfg);

	stores
		.narrative
		.save(&NarrativeSnapshot { vector: vec![1.0], updated_at: None })
		.expect("Save failed.");

	assert_eq!(stores.narrative.location(), "memory");
	assert!(!dir.path().join("unused").exists());
	assert!(stores.narrative.load().expect("Load failed.").is_some());
}
