//! The boot section (IPL3) of the ROM and the trailer which tells the bootloader how large the
//! kernel is.

use crate::{BOOT_SECTION_SIZE, BOOT_TRAILER_SIZE};
use binrw::{BinRead, BinWrite};
use easyerr::{Error, ResultExt};
use std::{
    fs::OpenOptions,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Size of a finalized boot image: the padded boot section followed by its trailer.
pub const BOOT_IMAGE_SIZE: usize = BOOT_SECTION_SIZE + BOOT_TRAILER_SIZE;

/// The two words placed right after the padded boot section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct BootTrailer {
    /// Size of the kernel ELF, in bytes.
    pub kernel_size: u32,
    /// Reserved. Keeps the kernel 8-byte aligned in the ROM.
    pub reserved: u32,
}

impl BootTrailer {
    pub fn new(kernel_size: u32) -> Self {
        Self {
            kernel_size,
            reserved: 0,
        }
    }
}

/// A finalized boot image, as produced by [`finalize_boot_image`].
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(big)]
pub struct BootImage {
    /// The padded boot section.
    #[br(count = BOOT_SECTION_SIZE)]
    pub section: Vec<u8>,
    /// Trailer describing the kernel.
    pub trailer: BootTrailer,
}

impl BootImage {
    /// Reads a finalized boot image from the file at `path`.
    pub fn read_from_path(path: &Path) -> Result<Self, BootError> {
        ensure_exists(path)?;

        let bytes = std::fs::read(path).map_err(io(path))?;
        if bytes.len() != BOOT_IMAGE_SIZE {
            return Err(BootError::Malformed {
                path: path.to_owned(),
                len: bytes.len(),
                expected: BOOT_IMAGE_SIZE,
            });
        }

        BootImage::read(&mut Cursor::new(bytes)).context(BootCtx::Format)
    }

    /// Length of the boot code, ignoring the trailing zero padding.
    pub fn code_len(&self) -> usize {
        self.section
            .iter()
            .rposition(|&byte| byte != 0)
            .map_or(0, |last| last + 1)
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    #[error("{path:?} doesn't exist")]
    NotFound { path: PathBuf },
    #[error("{path:?} is too large: {len} bytes vs {max} max")]
    OversizedInput {
        path: PathBuf,
        len: usize,
        max: usize,
    },
    #[error("{path:?} is too large for a 32-bit size word: {len} bytes")]
    KernelTooLarge { path: PathBuf, len: u64 },
    #[error("{path:?} is not a boot image: {len} bytes vs {expected} expected")]
    Malformed {
        path: PathBuf,
        len: usize,
        expected: usize,
    },
    #[error("i/o failure on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Format { source: binrw::Error },
}

fn io(path: &Path) -> impl FnOnce(std::io::Error) -> BootError + '_ {
    move |source| BootError::Io {
        path: path.to_owned(),
        source,
    }
}

fn ensure_exists(path: &Path) -> Result<(), BootError> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(BootError::NotFound {
            path: path.to_owned(),
        }),
        Err(source) => Err(BootError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Pads `section` with zeroes up to `len` bytes.
///
/// Returns how many bytes were added, or `None` if the section is already larger than `len`, in
/// which case it is left untouched.
pub fn pad_section(section: &mut Vec<u8>, len: usize) -> Option<usize> {
    let padding = len.checked_sub(section.len())?;
    section.resize(len, 0);

    Some(padding)
}

/// Outcome of padding a boot section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// The section already had the exact size and the file was not written.
    Unchanged,
    /// The file was rewritten with `added` zero bytes at the end.
    Padded { added: usize },
}

/// Pads the boot section at `path` in place to exactly [`BOOT_SECTION_SIZE`] bytes.
///
/// An oversized section is an error and leaves the file untouched.
pub fn pad_boot_section(path: &Path) -> Result<Padding, BootError> {
    ensure_exists(path)?;

    let mut section = std::fs::read(path).map_err(io(path))?;
    let len = section.len();
    let Some(added) = pad_section(&mut section, BOOT_SECTION_SIZE) else {
        return Err(BootError::OversizedInput {
            path: path.to_owned(),
            len,
            max: BOOT_SECTION_SIZE,
        });
    };

    if added == 0 {
        debug!(path = %path.display(), "boot section already padded");
        return Ok(Padding::Unchanged);
    }

    info!(path = %path.display(), len, added, "padding boot section");
    std::fs::write(path, &section).map_err(io(path))?;

    Ok(Padding::Padded { added })
}

/// Result of [`finalize_boot_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalized {
    pub padding: Padding,
    pub kernel_size: u32,
}

/// Pads the boot section at `boot` and appends a [`BootTrailer`] holding the size of the file at
/// `kernel`.
///
/// Both files are checked, and the kernel size validated, before anything is written. The trailer
/// is appended even when the section needed no padding.
pub fn finalize_boot_image(boot: &Path, kernel: &Path) -> Result<Finalized, BootError> {
    ensure_exists(boot)?;
    ensure_exists(kernel)?;

    let len = std::fs::metadata(kernel).map_err(io(kernel))?.len();
    let kernel_size = u32::try_from(len).map_err(|_| BootError::KernelTooLarge {
        path: kernel.to_owned(),
        len,
    })?;

    let padding = pad_boot_section(boot)?;

    let mut trailer = Cursor::new(Vec::with_capacity(BOOT_TRAILER_SIZE));
    BootTrailer::new(kernel_size)
        .write(&mut trailer)
        .context(BootCtx::Format)?;

    let mut file = OpenOptions::new()
        .append(true)
        .open(boot)
        .map_err(io(boot))?;
    file.write_all(trailer.get_ref()).map_err(io(boot))?;

    debug!(path = %boot.display(), kernel_size, "appended boot trailer");

    Ok(Finalized {
        padding,
        kernel_size,
    })
}
