//! Firmware image fixtures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A firmware image at `<tmp>/build/<program>.bin`, laid out the way a build
/// tool leaves it.
///
/// The temp directory is deleted automatically when this value is dropped.
pub struct FirmwareFixture {
    build_dir: PathBuf,
    program_name: String,
    contents: Vec<u8>,
    _temp_dir: TempDir,
}

impl FirmwareFixture {
    /// Write `contents` as `<program_name>.bin`.
    pub fn new(program_name: &str, contents: &[u8]) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let build_dir = temp_dir.path().join("build");
        std::fs::create_dir_all(&build_dir).expect("failed to create build dir");
        std::fs::write(build_dir.join(format!("{program_name}.bin")), contents)
            .expect("failed to write firmware image");

        Self {
            build_dir,
            program_name: program_name.to_string(),
            contents: contents.to_vec(),
            _temp_dir: temp_dir,
        }
    }

    /// A 10-byte `app.bin`.
    pub fn small() -> Self {
        Self::new("app", b"\x7fFW\x00\x01\x02\x03\x04\x05\xff")
    }

    /// A deterministic pseudo-random image of `len` bytes.
    pub fn sized(program_name: &str, len: usize) -> Self {
        let contents: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        Self::new(program_name, &contents)
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn path(&self) -> PathBuf {
        self.build_dir.join(format!("{}.bin", self.program_name))
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Root of the temp directory, for placing config files next to the build.
    pub fn root(&self) -> &Path {
        self._temp_dir.path()
    }
}
