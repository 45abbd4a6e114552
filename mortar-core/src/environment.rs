use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mortar_kernel::build::Build;
use mortar_kernel::machines::Machines;
use mortar_kernel::options::OptionStore;

/// Per-run environment: tree roots, machine descriptors and the option
/// store. Shared by every evaluator of the run.
pub struct Environment {
    pub source_root: PathBuf,
    pub build_root: PathBuf,
    pub machines: Machines,
    pub options: RefCell<OptionStore>,
}

impl Environment {
    pub fn new(source_root: PathBuf, build_root: PathBuf, machines: Machines) -> Self {
        Self {
            source_root,
            build_root,
            machines,
            options: RefCell::new(OptionStore::with_builtin_options()),
        }
    }

    /// Scratch space for generated files (configure-file temp outputs,
    /// per-subproject generated build definitions).
    pub fn scratch_dir(&self) -> PathBuf {
        self.build_root.join("mortar-private")
    }

    pub fn ensure_scratch_dir(&self) -> io::Result<PathBuf> {
        let dir = self.scratch_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Writes the records the backend and reconfiguration logic read back:
    /// the build-definition file list and the dependency manifest.
    pub fn persist_state(&self, build: &Build) -> io::Result<()> {
        let dir = self.ensure_scratch_dir()?;

        let files: Vec<String> = build
            .build_def_files()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        atomic_write(
            &dir.join("build_def_files.json"),
            serde_json::to_string_pretty(&files)
                .map_err(|e| io::Error::other(e.to_string()))?
                .as_bytes(),
        )?;

        atomic_write(
            &dir.join("dep_manifest.json"),
            serde_json::to_string_pretty(&build.dep_manifest)
                .map_err(|e| io::Error::other(e.to_string()))?
                .as_bytes(),
        )?;

        Ok(())
    }
}

/// Temp-plus-rename write, so readers never observe a half-written file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("output path has no parent directory"))?;
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
