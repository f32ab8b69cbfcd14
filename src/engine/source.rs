// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::BufferMode;

/// Random-access byte source backing a file-mode job. Workers call
/// `read_at` concurrently from their own threads, so implementations must
/// be `Sync` without any shared cursor state.
pub trait ByteSource: Send + Sync {
    fn len(&self) -> u64;
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens its own file handle per read so concurrent workers never contend
/// on a shared cursor or a shared lock.
pub struct FileSource {
    path: PathBuf,
    len: u64,
    buffer_mode: BufferMode,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>, buffer_mode: BufferMode) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let len = std::fs::metadata(&path)?.len();
        Ok(Self {
            path,
            len,
            buffer_mode,
        })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let file = File::open(&self.path)?;
        let n = read_at_impl(&file, buf, offset)?;

        if matches!(self.buffer_mode, BufferMode::Unbuffered) {
            advise_dontneed(&file, offset, n);
        }

        Ok(n)
    }
}

#[cfg(unix)]
fn read_at_impl(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    // A read landing past EOF returns Ok(0) rather than an error, same as
    // a short read anywhere else in the file.
    file.read_at(buf, offset)
}

#[cfg(not(unix))]
fn read_at_impl(mut file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Read, Seek, SeekFrom};
    file.seek(SeekFrom::Start(offset))?;
    file.read(buf)
}

#[cfg(unix)]
fn advise_dontneed(file: &File, offset: u64, len: usize) {
    use std::os::unix::io::AsRawFd;
    // Best effort: a failed hint must never fail the job.
    let _ = nix::fcntl::posix_fadvise(
        file.as_raw_fd(),
        offset as i64,
        len as i64,
        nix::fcntl::PosixFadviseAdvice::POSIX_FADV_DONTNEED,
    );
}

#[cfg(not(unix))]
fn advise_dontneed(_file: &File, _offset: u64, _len: usize) {}

/// Reads a stream to exhaustion, filling `buf` as far as it will go and
/// returning how much was actually read. Unlike `Read::read`, this loops
/// past short reads so a slow pipe doesn't masquerade as a partition
/// boundary.
pub fn read_full(reader: &mut dyn io::Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Either a random-access file or a one-shot stream, chosen by the Byte
/// Source Adapter before a job's planner is spawned.
pub enum SourceMode {
    File {
        source: std::sync::Arc<dyn ByteSource>,
        length: u64,
    },
    Stream {
        reader: Box<dyn io::Read + Send>,
    },
}
