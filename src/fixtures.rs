// Canonical request fixtures for parcelprobe
// Loaded once at startup from a directory of JSON files (walkdir + serde_json)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use crate::document::Document;

pub const VALID_PICKUP: &str = "valid_pickup";
pub const INVALID_PICKUP_MISSING_CONTACT: &str = "invalid_pickup_missing_contact";
pub const INVALID_PICKUP_BAD_EMAIL: &str = "invalid_pickup_bad_email";
pub const VALID_BANK_INFO: &str = "valid_bank_info";

const BUNDLED: &[(&str, &str)] = &[
    ("pickups.json", include_str!("../config/testdata/pickups.json")),
    ("bank_info.json", include_str!("../config/testdata/bank_info.json")),
];

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must contain a top-level JSON object")]
    NotAnObject(String),

    #[error("fixture '{name}' defined twice ({first} and {second})")]
    Duplicate { name: String, first: String, second: String },

    #[error("no fixture named '{0}'")]
    Missing(String),
}

/// Named canonical documents. Every accessor hands out a fresh deep copy.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    documents: BTreeMap<String, (String, Document)>,
}

impl Fixtures {
    /// Load every `*.json` file below `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let mut fixtures = Fixtures::default();
        let mut files: Vec<PathBuf> = WalkDir::new(dir.as_ref())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .map(|e| e.into_path())
            .collect();
        files.sort();

        for path in files {
            let content = std::fs::read_to_string(&path)
                .map_err(|source| FixtureError::Io { path: path.clone(), source })?;
            fixtures.add_source(&path.display().to_string(), &content)?;
        }
        debug!("loaded {} fixtures from {:?}", fixtures.len(), dir.as_ref());
        Ok(fixtures)
    }

    /// The fixture files compiled into the binary.
    pub fn bundled() -> Result<Self, FixtureError> {
        let mut fixtures = Fixtures::default();
        for (origin, content) in BUNDLED {
            fixtures.add_source(origin, content)?;
        }
        Ok(fixtures)
    }

    fn add_source(&mut self, origin: &str, content: &str) -> Result<(), FixtureError> {
        let json: Value = serde_json::from_str(content)
            .map_err(|source| FixtureError::Parse { origin: origin.to_string(), source })?;
        let Value::Object(entries) = json else {
            return Err(FixtureError::NotAnObject(origin.to_string()));
        };
        for (name, document) in entries {
            if let Some((first, _)) = self.documents.get(&name) {
                return Err(FixtureError::Duplicate {
                    name,
                    first: first.clone(),
                    second: origin.to_string(),
                });
            }
            self.documents.insert(name, (origin.to_string(), document));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Document, FixtureError> {
        self.documents
            .get(name)
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| FixtureError::Missing(name.to_string()))
    }

    pub fn valid_pickup(&self) -> Result<Document, FixtureError> {
        self.get(VALID_PICKUP)
    }

    pub fn invalid_pickup_missing_contact(&self) -> Result<Document, FixtureError> {
        self.get(INVALID_PICKUP_MISSING_CONTACT)
    }

    pub fn invalid_pickup_bad_email(&self) -> Result<Document, FixtureError> {
        self.get(INVALID_PICKUP_BAD_EMAIL)
    }

    pub fn valid_bank_info(&self) -> Result<Document, FixtureError> {
        self.get(VALID_BANK_INFO)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
