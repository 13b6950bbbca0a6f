use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_sarif::sarif::{Artifact, ArtifactLocation, ArtifactRoles};
use zip::ZipArchive;

use crate::ir::Class;

const LISTING_EXTENSION: &str = "json";

/// Class listings and the artifacts they were read from.
///
/// Every listing artifact is an analysis target; an archive is recorded as the
/// parent of its entries.
#[derive(Default)]
pub(crate) struct ScanOutput {
    pub(crate) artifacts: Vec<Artifact>,
    pub(crate) classes: Vec<Class>,
}

/// Read a listing file, a directory tree of listing files, or a `.zip`/`.jar`
/// of listings. Directory and archive contents are read in sorted path order.
pub(crate) fn scan_inputs(input: &Path) -> Result<ScanOutput> {
    let mut scan = ScanOutput::default();
    if input.is_dir() {
        for path in listing_files(input)? {
            scan.read_listing_file(&path)?;
        }
    } else {
        match input.extension().and_then(|ext| ext.to_str()) {
            Some(LISTING_EXTENSION) => scan.read_listing_file(input)?,
            Some("zip" | "jar") => scan.read_archive(input)?,
            _ => anyhow::bail!("unsupported input file: {}", input.display()),
        }
    }
    Ok(scan)
}

/// Listing files under `dir`, recursively, sorted by path. Other files are ignored.
fn listing_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current)
            .with_context(|| format!("failed to read directory {}", current.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to read entry under {}", current.display()))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == LISTING_EXTENSION) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

impl ScanOutput {
    fn read_listing_file(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let uri = path.to_string_lossy().into_owned();
        self.add_listing(&data, uri, None)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    fn read_archive(&mut self, path: &Path) -> Result<()> {
        let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let archive_len = file
            .metadata()
            .with_context(|| format!("failed to read {}", path.display()))?
            .len();
        let mut archive =
            ZipArchive::new(file).with_context(|| format!("failed to read {}", path.display()))?;
        let archive_index = self.add_artifact(path.to_string_lossy().into_owned(), archive_len);

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|name| name.ends_with(".json"))
            .map(str::to_string)
            .collect();
        names.sort();

        for name in names {
            let mut entry = archive
                .by_name(&name)
                .with_context(|| format!("failed to read {}:{}", path.display(), name))?;
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("failed to read {}:{}", path.display(), name))?;
            let uri = format!("jar:{}!/{}", path.to_string_lossy(), name);
            self.add_listing(&data, uri, Some(archive_index))
                .with_context(|| format!("failed to parse {}:{}", path.display(), name))?;
        }
        Ok(())
    }

    /// Parse one listing and record it as an analysis target.
    fn add_listing(&mut self, data: &[u8], uri: String, parent: Option<i64>) -> Result<()> {
        let mut class: Class = serde_json::from_slice(data)?;
        if class.name.is_empty() {
            anyhow::bail!("class listing has an empty name");
        }
        let index = self.add_artifact(uri, data.len() as u64);
        let artifact = &mut self.artifacts[index as usize];
        artifact.parent_index = parent;
        artifact.roles = Some(vec![
            serde_json::to_value(ArtifactRoles::AnalysisTarget).context("serialize artifact role")?,
        ]);
        class.artifact_index = index;
        self.classes.push(class);
        Ok(())
    }

    fn add_artifact(&mut self, uri: String, len: u64) -> i64 {
        let artifact = Artifact::builder()
            .location(ArtifactLocation::builder().uri(uri).build())
            .length(len as i64)
            .build();
        self.artifacts.push(artifact);
        (self.artifacts.len() - 1) as i64
    }
}
