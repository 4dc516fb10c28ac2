//! The loaded-once DBMS catalog.

use std::collections::HashMap;
use std::path::Path;

use dbdeploy_common::error::{DeployError, Result};

use crate::model::{DbmsEntry, RawDbms, Release};

/// Immutable lookup from DBMS name to its ordered releases.
///
/// Built once at startup and passed by reference to the resolver and the
/// bisector.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<DbmsEntry>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Loads and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// violates a catalog invariant.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading catalog");
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if the document is malformed, a DBMS
    /// name repeats, or a release is invalid.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<RawDbms> = serde_json::from_str(content).map_err(|e| DeployError::Config {
            message: format!("malformed catalog: {e}"),
        })?;
        let entries = raw
            .into_iter()
            .map(DbmsEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Builds a catalog from already constructed entries.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if two entries share a name.
    pub fn from_entries(entries: Vec<DbmsEntry>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), i).is_some() {
                return Err(DeployError::Config {
                    message: format!("duplicate dbms {}", entry.name),
                });
            }
        }
        tracing::debug!(dbms = entries.len(), "catalog ready");
        Ok(Self { entries, by_name })
    }

    /// Returns all DBMS entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[DbmsEntry] {
        &self.entries
    }

    /// Looks up a DBMS by name.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the DBMS is unknown.
    pub fn find_dbms(&self, name: &str) -> Result<&DbmsEntry> {
        self.by_name
            .get(name)
            .and_then(|&i| self.entries.get(i))
            .ok_or_else(|| DeployError::NotFound {
                kind: "dbms",
                id: name.to_string(),
            })
    }

    /// Looks up a release of a DBMS by exact identifier.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the DBMS or the release is unknown.
    pub fn find_release(&self, dbms: &str, id: &str) -> Result<&Release> {
        self.find_dbms(dbms)?
            .release(id)
            .ok_or_else(|| DeployError::NotFound {
                kind: "release",
                id: format!("{dbms} {id}"),
            })
    }
}
