use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zip::ZipArchive;

/// Where one GTFS feed lives: an unpacked directory or a zip archive.
#[derive(Clone, Debug)]
pub enum GtfsSource {
    Directory(PathBuf),
    Zip(PathBuf),
}

impl GtfsSource {
    /// Fails if the path is neither a directory nor a readable zip archive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        if !path.is_file() {
            bail!("{} is neither a GTFS directory nor a zip file", path.display());
        }
        let file = fs_err::File::open(path)?;
        ZipArchive::new(file).map_err(|err| {
            anyhow!(
                "{} is neither a GTFS directory nor a zip file: {err}",
                path.display()
            )
        })?;
        Ok(Self::Zip(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Zip(path) => path,
        }
    }

    pub fn has_file(&self, name: &str) -> bool {
        match self {
            Self::Directory(dir) => dir.join(name).is_file(),
            Self::Zip(_) => match self.archive() {
                Ok(archive) => find_entry(&archive, name).is_some(),
                Err(_) => false,
            },
        }
    }

    /// Entries in an archive are read fully into memory; directory files are streamed.
    pub fn open_file(&self, name: &str) -> Result<Box<dyn Read>> {
        match self {
            Self::Directory(dir) => {
                let file = fs_err::File::open(dir.join(name))?;
                Ok(Box::new(std::io::BufReader::new(file)))
            }
            Self::Zip(path) => {
                let mut archive = self.archive()?;
                let entry = match find_entry(&archive, name) {
                    Some(entry) => entry,
                    None => bail!("{}: no {name} in the archive", path.display()),
                };
                let mut file = archive
                    .by_name(&entry)
                    .map_err(|err| anyhow!("{}: {entry}: {err}", path.display()))?;
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)
                    .with_context(|| format!("{}: reading {entry}", path.display()))?;
                Ok(Box::new(Cursor::new(bytes)))
            }
        }
    }

    fn archive(&self) -> Result<ZipArchive<fs_err::File>> {
        let file = fs_err::File::open(self.path())?;
        ZipArchive::new(file).map_err(|err| anyhow!("{}: {err}", self.path().display()))
    }
}

impl fmt::Display for GtfsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

// Feeds are often zipped up with a top-level folder, so gtfs/shapes.txt counts as shapes.txt
fn find_entry<R: Read + std::io::Seek>(archive: &ZipArchive<R>, name: &str) -> Option<String> {
    let mut nested = None;
    for entry in archive.file_names() {
        if entry == name {
            return Some(entry.to_string());
        }
        if nested.is_none() && entry.rsplit('/').next() == Some(name) {
            nested = Some(entry.to_string());
        }
    }
    nested
}
