//! Test fixtures for the Veil pipeline: JSON scenario loading plus test
//! doubles for every collaborator trait.
//!
//! Everything here panics on malformed fixtures; it is only ever linked into
//! tests.

pub mod doubles;
pub mod scenario;

use std::path::PathBuf;

use serde::de::DeserializeOwned;

pub use doubles::{
    chunk, FailingIndex, FlakyIndex, KeywordEmbedder, RecordingMessageStore, ScriptedModel,
    SlowIndex,
};
pub use scenario::{ChunkFixture, Scenario};

/// Root of the fixture data directory.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load a fixture file as raw JSON.
pub fn load_fixture_value(relative_path: &str) -> serde_json::Value {
    load_fixture(relative_path)
}

pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// Load a scenario from `data/scenarios/<name>.json`.
pub fn load_scenario(name: &str) -> Scenario {
    load_fixture(&format!("scenarios/{name}.json"))
}
