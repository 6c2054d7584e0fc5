//! Resolves `uses` clauses to source files on disk and parses each unit
//! exactly once, regardless of how many times it is referenced.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::Unit;
use crate::parser::Parser;

const SEARCH_DIRS: &[&str] = &[".", "./units", "..", "../units"];
const EXTENSIONS: &[&str] = &["pas", "pp", "p"];

#[derive(Debug)]
pub struct UnitLoadError {
    pub unit_name: String,
    pub message: String,
}

impl std::fmt::Display for UnitLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot load unit '{}': {}", self.unit_name, self.message)
    }
}

impl std::error::Error for UnitLoadError {}

/// Loads units on demand and caches each by lower-cased name so a unit
/// referenced from several `uses` clauses is parsed only once.
pub struct UnitLoader {
    base_dir: PathBuf,
    extra_dirs: Vec<String>,
    cache: HashMap<String, Unit>,
}

impl UnitLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        UnitLoader {
            base_dir: base_dir.into(),
            extra_dirs: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Appends project-configured search directories, tried after the
    /// built-in `SEARCH_DIRS` list.
    pub fn with_extra_dirs(mut self, dirs: Vec<String>) -> Self {
        self.extra_dirs = dirs;
        self
    }

    /// Returns the already-loaded unit, or searches the configured path,
    /// parses it, caches it, and returns the freshly parsed unit.
    pub fn load(&mut self, name: &str) -> Result<&Unit, UnitLoadError> {
        let key = name.to_ascii_lowercase();
        if !self.cache.contains_key(&key) {
            let path = self.resolve_path(name).ok_or_else(|| UnitLoadError {
                unit_name: name.to_string(),
                message: "not found on search path".to_string(),
            })?;
            let source = fs::read_to_string(&path).map_err(|e| UnitLoadError {
                unit_name: name.to_string(),
                message: e.to_string(),
            })?;
            let mut parser = Parser::new(&source);
            let unit = parser.parse_unit().ok_or_else(|| UnitLoadError {
                unit_name: name.to_string(),
                message: "failed to parse".to_string(),
            })?;
            if !parser.errors().is_empty() {
                return Err(UnitLoadError {
                    unit_name: name.to_string(),
                    message: parser.errors().join("; "),
                });
            }
            self.cache.insert(key.clone(), unit);
        }
        Ok(self.cache.get(&key).expect("just inserted"))
    }

    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        let dirs = SEARCH_DIRS.iter().map(|s| s.to_string()).chain(self.extra_dirs.iter().cloned());
        for dir in dirs {
            for candidate_name in [name.to_string(), name.to_ascii_lowercase()] {
                for ext in EXTENSIONS {
                    let path = self.base_dir.join(&dir).join(format!("{candidate_name}.{ext}"));
                    if path.is_file() {
                        return Some(normalize(&path));
                    }
                }
            }
        }
        None
    }

    pub fn loaded_units(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(String::as_str)
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_caches_unit_once() {
        let dir = tempfile::tempdir().unwrap();
        let unit_path = dir.path().join("mathutil.pas");
        let mut f = fs::File::create(&unit_path).unwrap();
        writeln!(
            f,
            "unit MathUtil; interface function Double(x: integer): integer; implementation function Double(x: integer): integer; begin Double := x * 2 end; begin end."
        )
        .unwrap();

        let mut loader = UnitLoader::new(dir.path());
        let unit = loader.load("MathUtil").unwrap();
        assert_eq!(unit.name, "MathUtil");
        assert_eq!(loader.loaded_units().count(), 1);

        // Second load of the same name (different case) hits the cache.
        loader.load("mathutil").unwrap();
        assert_eq!(loader.loaded_units().count(), 1);
    }

    #[test]
    fn missing_unit_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = UnitLoader::new(dir.path());
        let err = loader.load("DoesNotExist").unwrap_err();
        assert!(err.to_string().contains("DoesNotExist"));
    }

    #[test]
    fn searches_units_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let units_dir = dir.path().join("units");
        fs::create_dir(&units_dir).unwrap();
        let mut f = fs::File::create(units_dir.join("strutil.pp")).unwrap();
        writeln!(f, "unit StrUtil; interface implementation begin end.").unwrap();

        let mut loader = UnitLoader::new(dir.path());
        let unit = loader.load("StrUtil").unwrap();
        assert_eq!(unit.name, "StrUtil");
    }
}
