//! Snapshot files (save on exit, restore on start).
//!
//! ## File format
//!
//! A snapshot is a bare sequence of fixed-size fields with no magic number,
//! version or length prefixes. Structured fields use bincode's fixed-width
//! little-endian encoding; byte buffers are stored raw.
//!
//! ```text
//! +------------------+
//! | Mode word        |  i32, model tag in bits 8..15
//! +------------------+
//! | Z80 registers    |  Z80Registers
//! +------------------+
//! | Port registers   |  32 bytes
//! +------------------+
//! | LCD controller   |  1024 bytes VRAM, then 6 register bytes
//! +------------------+
//! | RAM              |  RAM size of the model in the mode word, raw
//! +------------------+
//! ```
//!
//! With [`Compression::Zlib`] the whole sequence is wrapped in a zlib
//! stream. Reading with `Zlib` selected also accepts uncompressed files.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::Compression;
use crate::cpu::Z80Registers;
use crate::error::{Error, Result};
use crate::lcd::VRAM_SIZE;
use crate::ports::PORT_COUNT;

/// zlib compression level used for snapshots.
const LEVEL: u8 = 6;

// ─── Per-component state structs ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcdState {
    pub buffer: [u8; VRAM_SIZE],
    pub status: u8,
    pub col: u8,
    pub row: u8,
    pub delay: bool,
    pub scroll: u8,
    pub contrast: u8,
}

/// Everything after the mode word.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: i32,
    pub registers: Z80Registers,
    pub ports: [u8; PORT_COUNT],
    pub lcd: LcdState,
    pub ram: Vec<u8>,
}

// ─── Field stream ───────────────────────────────────────────────────────────

impl Snapshot {
    /// Write every field in file order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        bincode::serialize_into(&mut *w, &self.mode)?;
        bincode::serialize_into(&mut *w, &self.registers)?;
        bincode::serialize_into(&mut *w, &self.ports)?;
        self.lcd.write_to(w)?;
        w.write_all(&self.ram)?;
        Ok(())
    }
}

impl LcdState {
    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.buffer)?;
        let regs = (self.status, self.col, self.row, self.delay, self.scroll, self.contrast);
        bincode::serialize_into(&mut *w, &regs)?;
        Ok(())
    }
}

/// Reads a snapshot field by field. The mode word comes first so the caller
/// can switch model (and so learn the RAM size) before reading the rest.
pub struct SnapshotReader<R> {
    inner: R,
}

impl<R: Read> SnapshotReader<R> {
    pub fn new(inner: R) -> Self {
        SnapshotReader { inner }
    }

    pub fn read_mode(&mut self) -> Result<i32> {
        self.field("mode")
    }

    /// Remaining fields, with `ram_size` bytes of RAM.
    pub fn read_body(&mut self, mode: i32, ram_size: usize) -> Result<Snapshot> {
        let registers = self.field("registers")?;
        let ports = self.field("ports")?;
        let lcd = self.read_lcd()?;
        let mut ram = vec![0u8; ram_size];
        self.raw(&mut ram, "RAM")?;
        Ok(Snapshot { mode, registers, ports, lcd, ram })
    }

    fn read_lcd(&mut self) -> Result<LcdState> {
        let mut buffer = [0u8; VRAM_SIZE];
        self.raw(&mut buffer, "LCD state")?;
        let (status, col, row, delay, scroll, contrast) = self.field("LCD state")?;
        Ok(LcdState { buffer, status, col, row, delay, scroll, contrast })
    }

    fn raw(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| truncated(e, what))
    }

    fn field<T: DeserializeOwned>(&mut self, what: &'static str) -> Result<T> {
        bincode::deserialize_from(&mut self.inner).map_err(|e| match *e {
            bincode::ErrorKind::Io(io) => truncated(io, what),
            other => Error::Codec(Box::new(other)),
        })
    }
}

fn truncated(e: io::Error, what: &'static str) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(what)
    } else {
        Error::Io(e)
    }
}

// ─── File I/O ───────────────────────────────────────────────────────────────

/// A file being written. Removed on drop unless [`commit`](Self::commit)ted,
/// so a failed save never leaves a partial snapshot behind.
struct PendingFile {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl PendingFile {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(PendingFile { path: path.to_path_buf(), out: Some(BufWriter::new(file)) })
    }

    fn commit(mut self) -> Result<()> {
        if let Some(out) = self.out.take() {
            let file = out.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.out.as_mut() {
            Some(out) => out.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "snapshot already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        drop(self.out.take());
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("could not remove partial snapshot {}: {e}", self.path.display());
        }
    }
}

/// Save a snapshot to `path`.
pub fn save_to_file(snapshot: &Snapshot, path: &Path, compression: Compression) -> Result<()> {
    let mut payload = Vec::with_capacity(snapshot.ram.len() + 2048);
    snapshot.write_to(&mut payload)?;

    let mut file = PendingFile::create(path)?;
    match compression {
        Compression::Plain => file.write_all(&payload)?,
        Compression::Zlib => {
            let packed = miniz_oxide::deflate::compress_to_vec_zlib(&payload, LEVEL);
            file.write_all(&packed)?;
        }
    }
    file.commit()
}

/// Open a snapshot for reading, undoing compression if present.
pub fn open(path: &Path, compression: Compression) -> Result<SnapshotReader<Cursor<Vec<u8>>>> {
    let data = std::fs::read(path)?;
    let data = match compression {
        Compression::Plain => data,
        Compression::Zlib => match miniz_oxide::inflate::decompress_to_vec_zlib(&data) {
            Ok(unpacked) => unpacked,
            Err(e) => {
                // Not a zlib stream: read it as stored
                log::debug!("{}: not compressed ({:?})", path.display(), e.status);
                data
            }
        },
    };
    Ok(SnapshotReader::new(Cursor::new(data)))
}
