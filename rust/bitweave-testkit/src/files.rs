//! Scratch files for stream-backed tests.

use std::{
    fs::File,
    io::{Seek, SeekFrom},
};

/// Creates an anonymous temporary file, removed when dropped.
pub fn scratch_file() -> anyhow::Result<File> {
    Ok(tempfile::tempfile()?)
}

/// Rewinds `file` and returns its length.
pub fn rewind(file: &mut File) -> anyhow::Result<u64> {
    let len = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// Writes `data` into a fresh scratch file, rewound and ready to read.
pub fn scratch_file_with(data: &[u8]) -> anyhow::Result<File> {
    use std::io::Write;

    let mut file = scratch_file()?;
    file.write_all(data)?;
    rewind(&mut file)?;
    Ok(file)
}
