//! Configuration loading and discovery for `noteworthy.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{BuildDefaults, NoteworthyConfig, ProjectConfig, ToolsConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "noteworthy.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse noteworthy.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the merged output path
    pub output: Option<PathBuf>,
    /// Override frontmatter inclusion
    pub frontmatter: Option<bool>,
    /// Override retention of individual PDFs
    pub leave_individual: Option<bool>,
    /// Override debug logging
    pub debug: Option<bool>,
    /// Replace the configured typst flags
    pub typst_flags: Option<Vec<String>>,
}

/// Find noteworthy.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for noteworthy.toml
/// 2. Check XDG_CONFIG_HOME/noteworthy/noteworthy.toml (or ~/.config/noteworthy/noteworthy.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find noteworthy.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("noteworthy").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find noteworthy.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a noteworthy.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("notes/noteworthy.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<NoteworthyConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<NoteworthyConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: NoteworthyConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no noteworthy.toml is found.
///
/// The project name is the current directory name. All paths follow the
/// standard template layout.
pub fn default_config() -> NoteworthyConfig {
    let project_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "noteworthy".to_string());

    NoteworthyConfig {
        project: ProjectConfig {
            name: project_name,
            renderer: PathBuf::from("templates/parser.typ"),
            build_dir: PathBuf::from("templates/build"),
            output: PathBuf::from("output.pdf"),
            archive: PathBuf::from("build_pdfs.zip"),
            hierarchy: PathBuf::from("config/hierarchy.json"),
            metadata: PathBuf::from("config/metadata.json"),
            constants: PathBuf::from("config/constants.json"),
            content: PathBuf::from("content"),
        },
        tools: ToolsConfig::default(),
        build: BuildDefaults::default(),
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut NoteworthyConfig, overrides: &CliOverrides) {
    if let Some(ref output) = overrides.output {
        config.project.output = output.clone();
    }

    if let Some(frontmatter) = overrides.frontmatter {
        config.build.frontmatter = frontmatter;
    }

    if let Some(leave_individual) = overrides.leave_individual {
        config.build.leave_individual = leave_individual;
    }

    if let Some(debug) = overrides.debug {
        config.build.debug = debug;
    }

    if let Some(ref flags) = overrides.typst_flags {
        config.build.typst_flags = flags.clone();
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[project]\nname = \"test\"")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[project]\nname = \"test\"")
            .expect("should write config content");

        let subdir = temp.path().join("content").join("01");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[project]
name = "lecture-notes"
output = "dist/lecture.pdf"

[build]
frontmatter = false
typst_flags = ["--ppi", "144"]
"#,
            )
            .expect("should write config content");

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.project.name, "lecture-notes");
        assert_eq!(config.project.output, PathBuf::from("dist/lecture.pdf"));
        assert!(!config.build.frontmatter);
        assert_eq!(config.build.typst_flags, vec!["--ppi", "144"]);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"this is not valid toml {{{")
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[project]
name = ""

[build]
poll_interval_ms = 0
"#,
            )
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        match result {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides_output() {
        let mut config = default_config();
        let overrides =
            CliOverrides { output: Some(PathBuf::from("dist/out.pdf")), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.project.output, PathBuf::from("dist/out.pdf"));
    }

    #[test]
    fn test_merge_cli_overrides_multiple() {
        let mut config = default_config();
        let overrides = CliOverrides {
            frontmatter: Some(false),
            leave_individual: Some(true),
            debug: Some(true),
            typst_flags: Some(vec!["--ppi".to_string(), "144".to_string()]),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert!(!config.build.frontmatter);
        assert!(config.build.leave_individual);
        assert!(config.build.debug);
        assert_eq!(config.build.typst_flags, vec!["--ppi", "144"]);
        assert_eq!(config.project.output, PathBuf::from("output.pdf"));
    }

    #[test]
    fn test_merge_cli_overrides_none_keeps_config() {
        let mut config = default_config();
        config.build.typst_flags = vec!["--font-path".to_string(), "fonts".to_string()];

        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config.build.typst_flags, vec!["--font-path", "fonts"]);
        assert!(config.build.frontmatter);
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        let absolute = Path::new("/other/path");
        assert_eq!(resolve_path(root, absolute), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        let relative = Path::new("templates/build");
        assert_eq!(resolve_path(root, relative), PathBuf::from("/project/templates/build"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/noteworthy.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert!(!config.project.name.is_empty());
        assert!(config.is_valid());
        assert_eq!(config.project.archive, PathBuf::from("build_pdfs.zip"));
    }
}
