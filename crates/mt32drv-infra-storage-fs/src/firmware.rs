use mt32drv_ports::firmware::{FirmwareError, FirmwareSource};
use mt32drv_ports::storage::SettingsDto;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Looks firmware images up by file name across an ordered list of directories.
///
/// Each directory is tried with the exact name first and then the lowercase
/// name, so `MT32_CONTROL.ROM` also finds `mt32_control.rom`.
#[derive(Clone, Debug)]
pub struct FsFirmwareSource {
    search_dirs: Vec<PathBuf>,
}

impl FsFirmwareSource {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// The configured extra path, then the working directory.
    pub fn from_settings(settings: &SettingsDto) -> Self {
        let mut search_dirs = Vec::new();
        if let Some(extra) = settings.extra_rom_path.as_deref().filter(|p| !p.is_empty()) {
            search_dirs.push(PathBuf::from(extra));
        }
        search_dirs.push(PathBuf::from("."));
        Self::new(search_dirs)
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let lower = name.to_ascii_lowercase();
        let mut paths = Vec::with_capacity(self.search_dirs.len() * 2);
        for dir in &self.search_dirs {
            paths.push(dir.join(name));
            if lower != name {
                paths.push(dir.join(&lower));
            }
        }
        paths
    }

    fn read_path(path: &Path, name: &str) -> Result<Option<Vec<u8>>, FirmwareError> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(FirmwareError::Io {
                name: name.to_string(),
                message: format!("{}: {}", path.display(), err),
            }),
        }
    }
}

impl Default for FsFirmwareSource {
    fn default() -> Self {
        Self::from_settings(&SettingsDto::default())
    }
}

impl FirmwareSource for FsFirmwareSource {
    fn read(&self, name: &str) -> Result<Vec<u8>, FirmwareError> {
        for path in self.candidates(name) {
            if let Some(data) = Self::read_path(&path, name)? {
                tracing::debug!("read {} from {}", name, path.display());
                return Ok(data);
            }
        }
        Err(FirmwareError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.candidates(name).iter().any(|path| path.is_file())
    }
}
