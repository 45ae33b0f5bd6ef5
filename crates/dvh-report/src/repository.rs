//! File-system repository for report, alias, and laterality definitions.
//!
//! Definitions are stored as JSON in a single directory: one
//! `{name}.report.json` per report template plus shared `aliases.json` and
//! `laterality.json` tables. The repository is the core-side replacement for
//! the GUI configuration loader; it performs no template validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dvh_match::{AliasTableEntry, LateralityDefinition, LateralityTables, ReferenceMatcher, build_alias_table};

use crate::report::Report;

const REPORT_SUFFIX: &str = ".report.json";
const ALIASES_FILE: &str = "aliases.json";
const LATERALITY_FILE: &str = "laterality.json";

/// Directory-based store for definition files.
#[derive(Debug, Clone)]
pub struct DefinitionRepository {
    base_dir: PathBuf,
}

impl DefinitionRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn report_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}{REPORT_SUFFIX}"))
    }

    /// Names of all stored report templates.
    pub fn list_reports(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.base_dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.base_dir)
            .with_context(|| format!("read dir: {}", self.base_dir.display()))?
        {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(REPORT_SUFFIX) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load_report(&self, name: &str) -> Result<Report> {
        let path = self.report_path(name);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read report definition: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse report definition: {}", path.display()))
    }

    pub fn save_report(&self, report: &Report) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("create dir: {}", self.base_dir.display()))?;
        let path = self.report_path(&report.name);
        let text = serde_json::to_string_pretty(report).context("serialize report definition")?;
        fs::write(&path, text)
            .with_context(|| format!("write report definition: {}", path.display()))?;
        Ok(path)
    }

    /// Loads the global alias table rows; a missing file is an empty table.
    pub fn load_alias_entries(&self) -> Result<Vec<AliasTableEntry>> {
        let path = self.base_dir.join(ALIASES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read alias table: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse alias table: {}", path.display()))
    }

    pub fn save_alias_entries(&self, entries: &[AliasTableEntry]) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("create dir: {}", self.base_dir.display()))?;
        let path = self.base_dir.join(ALIASES_FILE);
        let text = serde_json::to_string_pretty(entries).context("serialize alias table")?;
        fs::write(&path, text).with_context(|| format!("write alias table: {}", path.display()))?;
        Ok(path)
    }

    /// Loads the laterality configuration; a missing file yields the
    /// built-in defaults.
    pub fn load_laterality(&self) -> Result<LateralityTables> {
        let path = self.base_dir.join(LATERALITY_FILE);
        if !path.exists() {
            return Ok(LateralityTables::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read laterality tables: {}", path.display()))?;
        let definition: LateralityDefinition = serde_json::from_str(&text)
            .with_context(|| format!("parse laterality tables: {}", path.display()))?;
        Ok(definition.into())
    }

    pub fn save_laterality(&self, definition: &LateralityDefinition) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("create dir: {}", self.base_dir.display()))?;
        let path = self.base_dir.join(LATERALITY_FILE);
        let text =
            serde_json::to_string_pretty(definition).context("serialize laterality tables")?;
        fs::write(&path, text)
            .with_context(|| format!("write laterality tables: {}", path.display()))?;
        Ok(path)
    }

    /// Builds a matcher from the stored alias and laterality definitions.
    pub fn build_matcher(&self) -> Result<ReferenceMatcher> {
        let aliases = build_alias_table(self.load_alias_entries()?);
        let laterality = self.load_laterality()?;
        Ok(ReferenceMatcher::new(aliases, laterality))
    }
}
