//! Layouts of the files that make up the first `0x1008` bytes of a Raku cartridge ROM.
//!
//! ```text
//! 0x0000  ROM header            (0x40 bytes)
//! 0x0040  boot section (IPL3)   (0xFC0 bytes, zero padded)
//! 0x1000  kernel size           (u32, big endian)
//! 0x1004  reserved              (u32, zero)
//! 0x1008  kernel ELF
//! ```

pub mod boot;
pub mod header;

pub use binrw;

use static_assertions::const_assert_eq;

/// Size of the ROM header.
pub const HEADER_SIZE: usize = 0x40;

/// Size of the region at the start of the ROM that is loaded by the console firmware: the ROM
/// header followed by the boot section.
pub const IPL3_REGION_SIZE: usize = 0x1000;

/// Size of a padded boot section.
pub const BOOT_SECTION_SIZE: usize = IPL3_REGION_SIZE - HEADER_SIZE;

/// Size of the trailer appended to the boot section by [`boot::finalize_boot_image`].
pub const BOOT_TRAILER_SIZE: usize = 8;

/// Offset in the ROM where the kernel ELF starts. The bootloader copies the kernel in 8-byte
/// words, so this must stay 8-byte aligned.
pub const KERNEL_OFFSET: usize = 0x1008;

const_assert_eq!(BOOT_SECTION_SIZE, 4032);
const_assert_eq!(HEADER_SIZE + BOOT_SECTION_SIZE + BOOT_TRAILER_SIZE, KERNEL_OFFSET);
const_assert_eq!(KERNEL_OFFSET % 8, 0);
