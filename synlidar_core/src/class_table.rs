// synlidar_core/src/class_table.rs

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::errors::ClassTableError;

/// How many trailing characters may be missing from a model name reported by
/// the world before it stops resolving.
pub const DEFAULT_TRUNCATION_DEPTH: usize = 3;

/// Lowercase, alphabetic-only form of a model name.
pub fn normalize_model_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Mapping from normalised vehicle model name to semantic class tag.
///
/// Built once, then shared read-only (usually behind an `Arc`) by every sensor.
/// Each registered name is also stored with up to `truncation_depth` trailing
/// characters stripped, so model strings that arrive cut short still resolve.
/// A stripped alias never overrides a name that was registered in full.
#[derive(Debug, Clone, Default)]
pub struct VehicleClassTable {
    classes: HashMap<String, String>,
    exact: HashSet<String>,
    truncation_depth: usize,
}

impl VehicleClassTable {
    pub fn new(truncation_depth: usize) -> Self {
        Self {
            classes: HashMap::new(),
            exact: HashSet::new(),
            truncation_depth,
        }
    }

    /// Reads `model,class` rows. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(
        reader: R,
        truncation_depth: usize,
    ) -> Result<Self, ClassTableError> {
        let mut table = Self::new(truncation_depth);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let malformed = || ClassTableError::MalformedLine {
                line: index + 1,
                content: trimmed.to_string(),
            };
            let (model, class) = trimmed.split_once(',').ok_or_else(malformed)?;
            let class = class.trim();
            if class.is_empty() || normalize_model_name(model).is_empty() {
                return Err(malformed());
            }
            table.insert(model, class);
        }
        debug!(entries = table.len(), "Vehicle class table parsed");
        Ok(table)
    }

    pub fn from_path(
        path: impl AsRef<Path>,
        truncation_depth: usize,
    ) -> Result<Self, ClassTableError> {
        let path = path.as_ref();
        let table = Self::from_reader(BufReader::new(File::open(path)?), truncation_depth)?;
        info!(
            path = %path.display(),
            entries = table.len(),
            "Loaded vehicle class table"
        );
        Ok(table)
    }

    /// Registers a model name and its truncated aliases. The first row for a
    /// name wins; a later exact name still replaces an alias.
    pub fn insert(&mut self, model: &str, class: &str) {
        let mut name = normalize_model_name(model);
        if name.is_empty() {
            return;
        }
        if self.exact.insert(name.clone()) {
            self.classes.insert(name.clone(), class.to_string());
        }

        for _ in 0..self.truncation_depth {
            if name.len() < 2 {
                break;
            }
            name.pop();
            if !self.exact.contains(&name) {
                self.classes
                    .entry(name.clone())
                    .or_insert_with(|| class.to_string());
            }
        }
    }

    /// Class tag of a model name as reported by the world. The name is
    /// normalised before the exact-match lookup.
    pub fn lookup(&self, model: &str) -> Option<&str> {
        self.classes
            .get(&normalize_model_name(model))
            .map(String::as_str)
    }

    pub fn truncation_depth(&self) -> usize {
        self.truncation_depth
    }

    /// Number of stored keys, aliases included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
