//! Compiler configuration: defaults, an optional `pascalc.toml` project
//! file, and the handful of settings that shape code generation without
//! changing the language semantics the analyzer enforces.

use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    Size,
    Speed,
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        OptimizationLevel::None
    }
}

/// An externally-provided routine the analyzer should accept without a
/// Pascal-side declaration, e.g. a platform shim supplied at link time.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalBuiltin {
    pub name: String,
    pub param_types: Vec<String>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub optimization: OptimizationLevel,
    /// Additional directories searched for `uses`-referenced units, tried
    /// after the built-in search path.
    #[serde(default)]
    pub unit_search_paths: Vec<String>,
    #[serde(default)]
    pub external_builtins: Vec<ExternalBuiltin>,
    /// Emit `// runtime: NAME provided by libpascalrt` prelude comments.
    /// Disabling this is only useful when embedding generated code inside
    /// a larger translation unit that declares those names itself.
    #[serde(default = "default_true")]
    pub emit_runtime_prelude: bool,
}

fn default_true() -> bool {
    true
}

impl CompilerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: toml::de::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "cannot read config '{}': {}", path, source),
            ConfigError::Parse { path, source } => write!(f, "invalid config '{}': {}", path, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_optimization_and_prelude_on() {
        let config = CompilerConfig::default();
        assert_eq!(config.optimization, OptimizationLevel::None);
        assert!(config.emit_runtime_prelude);
    }

    #[test]
    fn loads_toml_with_external_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pascalc.toml");
        std::fs::write(
            &path,
            r#"
            optimization = "speed"
            unit_search_paths = ["vendor"]

            [[external_builtins]]
            name = "PlatformBeep"
            param_types = []
            "#,
        )
        .unwrap();
        let config = CompilerConfig::load(&path).unwrap();
        assert_eq!(config.optimization, OptimizationLevel::Speed);
        assert_eq!(config.unit_search_paths, vec!["vendor".to_string()]);
        assert_eq!(config.external_builtins.len(), 1);
        assert_eq!(config.external_builtins[0].name, "PlatformBeep");
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = CompilerConfig::load(Path::new("/nonexistent/pascalc.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
