// `.odm` project files: the image selection, processing preset/options and
// server settings saved as pretty JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::presets::{Preset, ProcessingOptions};
use crate::settings::ServerSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub preset: Preset,
    pub images: Vec<PathBuf>,
    pub options: ProcessingOptions,
    pub odm_settings: ServerSettings,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let mut project: Project = serde_json::from_str(&raw)
            .with_context(|| format!("parsing project {}", path.display()))?;
        // A named preset wins over whatever options were stored next to it.
        project.preset.apply(&mut project.options);
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("encoding project")?;
        fs::write(path, json).with_context(|| format!("writing project {}", path.display()))?;
        Ok(())
    }

    /// Images referenced by the project that are no longer on disk.
    pub fn missing_images(&self) -> Vec<&Path> {
        self.images
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(dir: &Path, preset: Preset) -> Project {
        Project {
            name: "Survey".into(),
            preset,
            images: vec![dir.join("IMG_0001.jpg"), dir.join("IMG_0002.jpg")],
            options: ProcessingOptions {
                threads: 6,
                ..ProcessingOptions::default()
            },
            odm_settings: ServerSettings::new("odm:3000", "tok").unwrap(),
        }
    }

    #[test]
    fn custom_project_round_trips() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("survey.odm");
        let project = sample(dir.path(), Preset::Custom);
        project.save(&path).unwrap();
        assert_eq!(Project::load(&path).unwrap(), project);
    }

    #[test]
    fn named_preset_is_reapplied_on_load() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("survey.odm");
        sample(dir.path(), Preset::FastOrthophoto).save(&path).unwrap();
        let loaded = Project::load(&path).unwrap();
        assert_eq!(Some(loaded.options), Preset::FastOrthophoto.options());
    }

    #[test]
    fn reports_missing_images() {
        let dir = tempdir().expect("create temp dir");
        let project = sample(dir.path(), Preset::Default);
        fs::write(&project.images[0], b"jpeg").unwrap();
        assert_eq!(project.missing_images(), vec![project.images[1].as_path()]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("broken.odm");
        fs::write(&path, "[]").unwrap();
        assert!(Project::load(&path).is_err());
    }
}
