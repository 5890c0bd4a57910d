//! Project discovery.
//!
//! A project is a directory holding one or more manifests and, optionally,
//! a `pinfile.toml`:
//! ```text
//! my-project/
//! ├── pinfile.toml          # Optional configuration
//! ├── requirements.txt      # Default manifest
//! ├── requirements/         # Further manifests selected by glob
//! │   └── dev.txt
//! └── pykan_editable/       # Editable install target
//! ```
//! Editable paths in every manifest are resolved against the project root.

use crate::check::{Checker, Report};
use crate::config::{Config, ConfigError, CONFIG_FILE};
use crate::manifest::{Manifest, ManifestError, MANIFEST_FILE};
use crate::requirement::LineError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading a project.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("project directory not found: {0}")]
    NotFound(PathBuf),

    #[error("no manifest found from: {0}")]
    ManifestNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Discovered layout of a project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Root directory of the project.
    pub root: PathBuf,

    /// Path to `pinfile.toml` (if it exists).
    pub config_path: Option<PathBuf>,

    /// Loaded configuration, defaults if there is no config file.
    pub config: Config,
}

impl ProjectLayout {
    /// Discover the project layout of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist or its config is
    /// invalid.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(ProjectError::NotFound(root));
        }

        let config_path = root.join(CONFIG_FILE);
        let (config, config_path) = if config_path.exists() {
            (Config::from_path(&config_path)?, Some(config_path))
        } else {
            (Config::default(), None)
        };

        Ok(Self {
            root,
            config_path,
            config,
        })
    }

    /// Find a project by searching upward for a config file or manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory in the chain holds either file.
    pub fn find_root(start: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let mut current = start.as_ref().to_path_buf();

        loop {
            if current.join(CONFIG_FILE).exists() || current.join(MANIFEST_FILE).exists() {
                return Self::discover(&current);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Err(ProjectError::ManifestNotFound(start.as_ref().to_path_buf())),
            }
        }
    }

    /// Expand the configured manifest patterns into existing files.
    ///
    /// The result is sorted by path components and free of duplicates;
    /// excluded paths are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid or a directory can't be read.
    pub fn manifest_paths(&self) -> Result<Vec<PathBuf>, ProjectError> {
        let excludes = self
            .config
            .project
            .exclude
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut paths = BTreeSet::new();
        let root = glob::Pattern::escape(&self.root.to_string_lossy());

        for pattern in &self.config.project.manifests {
            let full_pattern = Path::new(&root).join(pattern);
            let pattern_str = full_pattern.to_string_lossy();

            for entry in glob::glob(&pattern_str)? {
                let path = entry.map_err(|e| ProjectError::Io(e.into_error()))?;

                if !path.is_file() {
                    continue;
                }

                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                let relative_str = relative.to_string_lossy();
                if excludes.iter().any(|p| p.matches(&relative_str)) {
                    continue;
                }

                paths.insert(path);
            }
        }

        Ok(paths.into_iter().collect())
    }
}

/// A manifest that belongs to a project.
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    /// Absolute or root-joined path to the file.
    pub path: PathBuf,

    /// Declarations from every line that parsed.
    pub manifest: Manifest,

    /// Lines that did not parse.
    pub errors: Vec<LineError>,
}

impl ProjectManifest {
    /// Read and leniently parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)?;
        let (manifest, errors) = Manifest::parse_lenient(&content);

        Ok(Self {
            path,
            manifest,
            errors,
        })
    }

    /// Returns true if every line parsed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Write the manifest back to its file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), ProjectError> {
        self.manifest.write_to(&self.path)?;
        Ok(())
    }
}

/// Check results for one manifest of a project.
#[derive(Debug, Clone)]
pub struct ManifestReport {
    /// Path of the manifest relative to the project root.
    pub path: PathBuf,

    /// Findings for that manifest.
    pub report: Report,
}

/// Check results for a whole project.
#[derive(Debug, Clone, Default)]
pub struct ProjectReport {
    pub manifests: Vec<ManifestReport>,
}

impl ProjectReport {
    /// Returns true if any manifest has an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.manifests.iter().any(|m| m.report.has_errors())
    }

    /// Returns true if no manifest has any finding.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.manifests.iter().all(|m| m.report.is_clean())
    }

    /// Total number of findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifests
            .iter()
            .map(|m| m.report.diagnostics.len())
            .sum()
    }

    /// Returns true if there are no findings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every finding, prefixed with its manifest path.
    #[must_use]
    pub fn render(&self) -> String {
        self.manifests
            .iter()
            .map(|m| m.report.render(&m.path.to_string_lossy()))
            .collect()
    }
}

/// A project with all of its manifests loaded.
#[derive(Debug, Clone)]
pub struct Project {
    /// The discovered layout.
    pub layout: ProjectLayout,

    /// Manifests in path order.
    pub manifests: Vec<ProjectManifest>,
}

impl Project {
    /// Load a project from its root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid or no manifest matches the
    /// configured patterns.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let layout = ProjectLayout::discover(root)?;
        Self::from_layout(layout)
    }

    /// Find and load a project by searching upward from a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no project is found.
    pub fn find(start: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let layout = ProjectLayout::find_root(start)?;
        Self::from_layout(layout)
    }

    fn from_layout(layout: ProjectLayout) -> Result<Self, ProjectError> {
        let paths = layout.manifest_paths()?;
        if paths.is_empty() {
            return Err(ProjectError::ManifestNotFound(layout.root.clone()));
        }

        let manifests = paths
            .iter()
            .map(ProjectManifest::load)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { layout, manifests })
    }

    /// Get a manifest by its path relative to the project root.
    #[must_use]
    pub fn manifest(&self, relative: impl AsRef<Path>) -> Option<&ProjectManifest> {
        let wanted = self.layout.root.join(relative);
        self.manifests.iter().find(|m| m.path == wanted)
    }

    /// Check every manifest with the project's configuration.
    #[must_use]
    pub fn check(&self) -> ProjectReport {
        let checker = Checker::new(self.layout.config.check);

        let manifests = self
            .manifests
            .iter()
            .map(|m| ManifestReport {
                path: m
                    .path
                    .strip_prefix(&self.layout.root)
                    .unwrap_or(&m.path)
                    .to_path_buf(),
                report: checker.check_lenient(&m.manifest, &m.errors, &self.layout.root),
            })
            .collect();

        ProjectReport { manifests }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discover_without_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "torch==2.0.1\n").unwrap();

        let layout = ProjectLayout::discover(tmp.path()).unwrap();
        assert!(layout.config_path.is_none());
        assert_eq!(layout.config, Config::default());
        assert_eq!(layout.manifest_paths().unwrap(), vec![tmp.path().join(MANIFEST_FILE)]);
    }

    #[test]
    fn discover_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = ProjectLayout::discover(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound(_)));
    }

    #[test]
    fn discover_invalid_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[project\n").unwrap();
        let err = ProjectLayout::discover(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::Config(_)));
    }

    #[test]
    fn find_root_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "torch==2.0.1\n").unwrap();
        fs::create_dir_all(tmp.path().join("experiments/deep")).unwrap();

        let layout = ProjectLayout::find_root(tmp.path().join("experiments/deep")).unwrap();
        assert_eq!(layout.root, tmp.path());
    }

    #[test]
    fn glob_patterns_and_excludes() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[project]\nmanifests = [\"requirements.txt\", \"requirements/*.txt\"]\nexclude = [\"requirements/legacy.txt\"]\n",
        )
        .unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "torch==2.0.1\n").unwrap();
        fs::create_dir(tmp.path().join("requirements")).unwrap();
        fs::write(tmp.path().join("requirements/dev.txt"), "ruff==0.4.8\n").unwrap();
        fs::write(tmp.path().join("requirements/legacy.txt"), "torch==1.0\n").unwrap();

        let layout = ProjectLayout::discover(tmp.path()).unwrap();
        let paths = layout.manifest_paths().unwrap();
        assert_eq!(
            paths,
            vec![
                tmp.path().join("requirements/dev.txt"),
                tmp.path().join("requirements.txt"),
            ]
        );
    }

    #[test]
    fn glob_root_with_pattern_characters() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("deps[1]");
        fs::create_dir(&root).unwrap();
        fs::write(root.join(MANIFEST_FILE), "torch==2.0.1\n").unwrap();
        // Would match an unescaped `deps[1]` pattern.
        fs::create_dir(tmp.path().join("deps1")).unwrap();
        fs::write(tmp.path().join("deps1").join(MANIFEST_FILE), "torch==1.0\n").unwrap();

        let layout = ProjectLayout::discover(&root).unwrap();
        assert_eq!(layout.manifest_paths().unwrap(), vec![root.join(MANIFEST_FILE)]);
    }

    #[test]
    fn load_without_manifest_fails() {
        let tmp = TempDir::new().unwrap();
        let err = Project::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::ManifestNotFound(_)));
    }

    #[test]
    fn load_and_check_project() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("pykan_editable")).unwrap();
        fs::write(
            tmp.path().join(MANIFEST_FILE),
            "torch==2.0.1\nnumpy>=1.26\n-e ./pykan_editable\n",
        )
        .unwrap();

        let project = Project::load(tmp.path()).unwrap();
        let manifest = project.manifest(MANIFEST_FILE).unwrap();
        assert!(!manifest.is_valid());
        assert_eq!(manifest.manifest.len(), 2);

        let report = project.check();
        assert!(report.has_errors());
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.render(),
            "requirements.txt:2: error[syntax]: unsupported version operator '>=', only exact pins ('==') are allowed\n"
        );
    }

    #[test]
    fn save_after_edit() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "# pins\ntorch==2.0.1\n").unwrap();

        let mut project = Project::load(tmp.path()).unwrap();
        let entry = &mut project.manifests[0];
        entry
            .manifest
            .bump("torch", crate::BumpLevel::Patch)
            .unwrap();
        entry.save().unwrap();

        let content = fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(content, "# pins\ntorch==2.0.2\n");
    }
}
