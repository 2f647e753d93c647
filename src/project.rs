//! The `.ocproj` TOML project schema and its semantic version type. Parsing is delegated to
//! `serde`/`toml` and the `semver` crate rather than hand-rolled, since TOML/semver grammars are
//! explicitly out of this crate's core scope.

use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::errors::CompileError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: Version,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub compiler_version: Option<Version>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub no_std: bool,
    #[serde(default)]
    pub emit_llvm: bool,
    #[serde(default)]
    pub skip_autolink: bool,
    #[serde(default)]
    pub output_folder: Option<String>,
    #[serde(default)]
    pub dependency_directories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project: ProjectSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Project {
    pub fn load_from_toml(text: &str) -> Result<Project, CompileError> {
        toml::from_str(text).map_err(|e| CompileError::io(format!("invalid .ocproj file: {e}")))
    }

    pub fn load_from_file(path: &Path) -> Result<Project, CompileError> {
        let text = std::fs::read_to_string(path)?;
        Project::load_from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, CompileError> {
        toml::to_string_pretty(self).map_err(|e| CompileError::io(format!("failed to serialize .ocproj: {e}")))
    }

    pub fn new(name: impl Into<String>) -> Project {
        Project {
            project: ProjectSection { name: name.into(), version: Version::new(0, 1, 0), compiler_version: None },
            build: BuildSection::default(),
            dependencies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_project() {
        let toml = r#"
            [project]
            name = "demo"
            version = "0.1.0"
        "#;
        let project = Project::load_from_toml(toml).unwrap();
        assert_eq!(project.project.name, "demo");
        assert_eq!(project.project.version, Version::new(0, 1, 0));
        assert!(!project.build.emit_llvm);
    }

    #[test]
    fn parses_dependencies_and_build_flags() {
        let toml = r#"
            [project]
            name = "demo"
            version = "1.2.3-rc.1+build.7"

            [build]
            no_std = true
            emit_llvm = true

            [[dependencies]]
            name = "stdshim"
            version = "2.0.0"
        "#;
        let project = Project::load_from_toml(toml).unwrap();
        assert!(project.build.no_std);
        assert_eq!(project.dependencies.len(), 1);
        assert_eq!(project.dependencies[0].name, "stdshim");
        assert_eq!(project.project.version.pre.as_str(), "rc.1");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Project::load_from_toml("not valid toml [[[").is_err());
    }

    #[test]
    fn round_trips_through_serialization() {
        let project = Project::new("roundtrip");
        let toml = project.to_toml().unwrap();
        let reparsed = Project::load_from_toml(&toml).unwrap();
        assert_eq!(reparsed.project.name, "roundtrip");
    }
}
