//! Index of the `.subckt` and `.model` definitions found in SPICE library
//! files.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// The declarations of one library file
#[derive(Debug, Clone, PartialEq)]
pub struct SpiceModel {
    pub names: Vec<String>,
    pub path: PathBuf,
    /// Files pulled in with `.include`, relative to this file's directory
    pub includes: Vec<PathBuf>,
}

impl SpiceModel {
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> SpiceModel {
        let path = path.into();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut names = Vec::new();
        let mut includes = Vec::new();
        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };
            match command.to_ascii_lowercase().as_str() {
                ".subckt" | ".model" => {
                    if let Some(name) = tokens.next() {
                        names.push(name.to_owned());
                    }
                }
                ".include" | ".inc" => {
                    let rest = line.trim_start()[command.len()..].trim();
                    let file = rest.trim_matches(|c| c == '"' || c == '\'');
                    if !file.is_empty() {
                        includes.push(dir.join(file));
                    }
                }
                _ => {}
            }
        }
        SpiceModel {
            names,
            path,
            includes,
        }
    }

    pub fn declares(&self, key: &str) -> bool {
        self.names.iter().any(|name| name.eq_ignore_ascii_case(key))
    }
}

/// Adds the files needed for `key` to `includes`, each at most once.
pub fn get_includes(key: &str, includes: &mut Vec<PathBuf>, models: &[SpiceModel]) {
    let mut found = false;
    for model in models.iter().filter(|model| model.declares(key)) {
        found = true;
        add_file(&model.path, includes, models);
    }
    if !found {
        log::warn!("no spice model found for {key}");
    }
}

fn add_file(path: &Path, includes: &mut Vec<PathBuf>, models: &[SpiceModel]) {
    if includes.iter().any(|known| known == path) {
        return;
    }
    includes.push(path.to_path_buf());
    if let Some(model) = models.iter().find(|model| model.path == path) {
        for include in &model.includes {
            add_file(include, includes, models);
        }
    }
}

fn is_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("lib") || ext.eq_ignore_ascii_case("mod"))
}

fn scan(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_dir() {
            scan(&path, files)?;
        } else if is_library(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// SPICE library files below a set of directories, read on first use.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    paths: Vec<PathBuf>,
    models: Option<Vec<SpiceModel>>,
}

impl ModelRegistry {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            models: None,
        }
    }

    pub fn models(&mut self) -> Result<&[SpiceModel], Error> {
        if self.models.is_none() {
            let mut files = Vec::new();
            for dir in self.paths.iter().filter(|dir| dir.is_dir()) {
                scan(dir, &mut files)?;
            }
            files.sort();
            let mut models = Vec::with_capacity(files.len());
            for file in files {
                let bytes = std::fs::read(&file).map_err(|e| Error::io(&file, e))?;
                models.push(SpiceModel::parse(&file, &String::from_utf8_lossy(&bytes)));
            }
            log::debug!("indexed {} spice library files", models.len());
            self.models = Some(models);
        }
        Ok(self.models.as_deref().unwrap_or_default())
    }

    pub fn contains(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.models()?.iter().any(|model| model.declares(key)))
    }
}
