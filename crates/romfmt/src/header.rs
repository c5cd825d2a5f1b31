//! The 64-byte header at the very start of an N64 cartridge ROM. The console firmware reads it
//! before running the boot section.
//!
//! See <https://n64brew.dev/wiki/ROM_Header>.

use crate::HEADER_SIZE;
use binrw::{BinRead, BinWrite};
use easyerr::{Error, ResultExt};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
    str::FromStr,
};
use strum::{Display, VariantArray};
use tracing::debug;

/// Width of the title field.
pub const TITLE_LEN: usize = 20;

/// Width of the game code field.
pub const GAME_CODE_LEN: usize = 4;

/// PI BSD DOM1 configuration flags: the cartridge bus timings used while the ROM is read.
pub const PI_CONFIG: u32 = 0x8037_1240;

/// Clock rate override. `0xF` keeps the default rate.
pub const CLOCK_RATE: u32 = 0x0000_000F;

/// Boot address. Zero lets the boot section choose where the kernel goes.
pub const BOOT_ADDRESS: u32 = 0x0000_0000;

/// Release (libultra) version.
pub const RELEASE: u32 = 0x0000_0001;

/// Title used when none is given.
pub const DEFAULT_TITLE: &str = "Summer";

/// Game code used when none is given.
pub const DEFAULT_GAME_CODE: &str = "NSuE";

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("title {title:?} is {len} bytes long, {max} max")]
    TitleTooLong {
        title: String,
        len: usize,
        max: usize,
    },
    #[error("title {title:?} contains characters other than printable ASCII")]
    TitleNotAscii { title: String },
    #[error("game code {code:?} is {len} bytes long, expected {expected}")]
    GameCodeLength {
        code: String,
        len: usize,
        expected: usize,
    },
    #[error("game code {code:?} contains characters other than ASCII letters and digits")]
    GameCodeCharacter { code: String },
}

/// The game title: printable ASCII, left justified and padded with spaces.
#[derive(Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct Title([u8; TITLE_LEN]);

impl Title {
    /// Creates a new title. Titles longer than [`TITLE_LEN`] bytes are rejected, never truncated.
    pub fn new(title: &str) -> Result<Self, FieldError> {
        if !title.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
            return Err(FieldError::TitleNotAscii {
                title: title.to_owned(),
            });
        }

        if title.len() > TITLE_LEN {
            return Err(FieldError::TitleTooLong {
                title: title.to_owned(),
                len: title.len(),
                max: TITLE_LEN,
            });
        }

        let mut bytes = [b' '; TITLE_LEN];
        bytes[..title.len()].copy_from_slice(title.as_bytes());

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; TITLE_LEN] {
        &self.0
    }

    /// The title without its padding. Some ROMs pad with NULs instead of spaces, so both are
    /// trimmed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0)
            .trim_end_matches([' ', '\0'])
            .to_owned()
    }
}

impl FromStr for Title {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Debug for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.text())
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

/// Kind of media a game is distributed on, the first character of the game code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, VariantArray)]
pub enum Category {
    #[strum(to_string = "Game Pak")]
    GamePak,
    #[strum(to_string = "64DD disk")]
    Disk,
    #[strum(to_string = "Expandable game (Game Pak)")]
    ExpandableGamePak,
    #[strum(to_string = "Expandable game (64DD disk)")]
    ExpandableDisk,
    #[strum(to_string = "Aleck64 Game Pak")]
    Aleck64,
}

impl Category {
    pub fn code(self) -> u8 {
        match self {
            Self::GamePak => b'N',
            Self::Disk => b'D',
            Self::ExpandableGamePak => b'C',
            Self::ExpandableDisk => b'E',
            Self::Aleck64 => b'Z',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|c| c.code() == code)
    }
}

/// Region a game is meant for, the last character of the game code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, VariantArray)]
pub enum Destination {
    All,
    Brazil,
    China,
    Germany,
    #[strum(to_string = "North America")]
    NorthAmerica,
    France,
    Netherlands,
    Italy,
    Japan,
    Korea,
    Canada,
    Europe,
    Spain,
    Australia,
    Scandinavia,
}

impl Destination {
    pub fn code(self) -> u8 {
        match self {
            Self::All => b'A',
            Self::Brazil => b'B',
            Self::China => b'C',
            Self::Germany => b'D',
            Self::NorthAmerica => b'E',
            Self::France => b'F',
            Self::Netherlands => b'H',
            Self::Italy => b'I',
            Self::Japan => b'J',
            Self::Korea => b'K',
            Self::Canada => b'N',
            Self::Europe => b'P',
            Self::Spain => b'S',
            Self::Australia => b'U',
            Self::Scandinavia => b'W',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|d| d.code() == code)
    }
}

/// The game code: category, two character unique code and destination.
#[derive(Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct GameCode([u8; GAME_CODE_LEN]);

impl GameCode {
    /// Creates a new game code. It must be exactly [`GAME_CODE_LEN`] ASCII letters or digits.
    pub fn new(code: &str) -> Result<Self, FieldError> {
        let Ok(bytes) = <[u8; GAME_CODE_LEN]>::try_from(code.as_bytes()) else {
            return Err(FieldError::GameCodeLength {
                code: code.to_owned(),
                len: code.len(),
                expected: GAME_CODE_LEN,
            });
        };

        if !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(FieldError::GameCodeCharacter {
                code: code.to_owned(),
            });
        }

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; GAME_CODE_LEN] {
        &self.0
    }

    pub fn text(self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn category(self) -> Option<Category> {
        Category::from_code(self.0[0])
    }

    pub fn unique_code(self) -> String {
        String::from_utf8_lossy(&self.0[1..3]).into_owned()
    }

    pub fn destination(self) -> Option<Destination> {
        Destination::from_code(self.0[3])
    }
}

impl FromStr for GameCode {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Debug for GameCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.text())
    }
}

impl std::fmt::Display for GameCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("{path:?} is too short for a ROM header: {len} bytes vs {expected} expected")]
    Truncated {
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

/// The ROM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct Header {
    /// PI BSD DOM1 configuration flags.
    pub pi_config: u32,
    /// Clock rate override.
    pub clock_rate: u32,
    /// Address the boot section is expected to load the program at.
    pub boot_address: u32,
    /// Release (libultra) version.
    pub release: u32,
    /// Checksum of the boot code. Always written as zero: nothing here computes it.
    pub check_code: u64,
    #[brw(pad_before = 8)]
    pub title: Title,
    #[brw(pad_before = 7)]
    pub game_code: GameCode,
    pub rom_version: u8,
}

impl Header {
    /// A header with the hardware constants and the given identification.
    pub fn new(title: Title, game_code: GameCode) -> Self {
        Self {
            pi_config: PI_CONFIG,
            clock_rate: CLOCK_RATE,
            boot_address: BOOT_ADDRESS,
            release: RELEASE,
            check_code: 0,
            title,
            game_code,
            rom_version: 0,
        }
    }

    /// Encodes this header into its [`HEADER_SIZE`] bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HeaderError> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        self.write(&mut cursor).context(HeaderCtx::Format)?;

        Ok(cursor.into_inner())
    }

    /// Reads the header at the start of the file at `path`, which may be a bare header or a whole
    /// ROM.
    pub fn read_from_path(path: &Path) -> Result<Self, HeaderError> {
        let bytes = std::fs::read(path).map_err(|source| HeaderError::Io {
            path: path.to_owned(),
            source,
        })?;

        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated {
                path: path.to_owned(),
                len: bytes.len(),
                expected: HEADER_SIZE,
            });
        }

        Header::read(&mut Cursor::new(&bytes[..HEADER_SIZE])).context(HeaderCtx::Format)
    }
}

/// Writes `header` to a newly created file at `path`, replacing any existing file.
pub fn generate(path: &Path, header: &Header) -> Result<(), HeaderError> {
    let bytes = header.to_bytes()?;
    std::fs::write(path, &bytes).map_err(|source| HeaderError::Io {
        path: path.to_owned(),
        source,
    })?;

    debug!(path = %path.display(), title = %header.title, game_code = %header.game_code, "wrote rom header");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn summer() -> Header {
        Header::new(
            Title::new(DEFAULT_TITLE).unwrap(),
            GameCode::new(DEFAULT_GAME_CODE).unwrap(),
        )
    }

    fn scratch(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("romfmt-header-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn header_layout() {
        let bytes = summer().to_bytes().unwrap();

        let mut expected: Vec<u8> = Vec::new();
        expected.extend([0x80, 0x37, 0x12, 0x40]);
        expected.extend([0x00, 0x00, 0x00, 0x0F]);
        expected.extend([0x00, 0x00, 0x00, 0x00]);
        expected.extend([0x00, 0x00, 0x00, 0x01]);
        expected.extend([0; 8]);
        expected.extend([0; 8]);
        expected.extend(b"Summer              ");
        expected.extend([0; 7]);
        expected.extend(b"NSuE");
        expected.push(0);

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn header_offsets() {
        let header = Header::new(Title::new("RAKU").unwrap(), GameCode::new("NRkJ").unwrap());
        let bytes = header.to_bytes().unwrap();

        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[0x00..0x04], &[0x80, 0x37, 0x12, 0x40]);
        assert_eq!(&bytes[0x20..0x34], b"RAKU                ");
        assert!(bytes[0x34..0x3B].iter().all(|&b| b == 0));
        assert_eq!(&bytes[0x3B..0x3F], b"NRkJ");
        assert_eq!(bytes[63], 0);
    }

    #[test]
    fn title_is_space_padded() {
        let title = Title::new("Summer").unwrap();
        assert_eq!(title.as_bytes(), b"Summer              ");
        assert_eq!(title.text(), "Summer");

        let full = Title::new("ABCDEFGHIJKLMNOPQRST").unwrap();
        assert_eq!(full.as_bytes(), b"ABCDEFGHIJKLMNOPQRST");

        let empty = Title::new("").unwrap();
        assert_eq!(empty.as_bytes(), &[b' '; TITLE_LEN]);
    }

    #[test]
    fn long_title_is_rejected() {
        let err = Title::new("ABCDEFGHIJKLMNOPQRSTU").unwrap_err();
        assert!(matches!(
            err,
            FieldError::TitleTooLong {
                len: 21,
                max: 20,
                ..
            }
        ));
    }

    #[test]
    fn non_ascii_title_is_rejected() {
        assert!(matches!(
            Title::new("Sommar\u{e4}"),
            Err(FieldError::TitleNotAscii { .. })
        ));
        assert!(matches!(
            Title::new("tab\there"),
            Err(FieldError::TitleNotAscii { .. })
        ));
    }

    #[test]
    fn game_code_is_validated() {
        assert!(matches!(
            GameCode::new("NSu"),
            Err(FieldError::GameCodeLength { len: 3, .. })
        ));
        assert!(matches!(
            GameCode::new("NSuEE"),
            Err(FieldError::GameCodeLength { len: 5, .. })
        ));
        assert!(matches!(
            GameCode::new("NS-E"),
            Err(FieldError::GameCodeCharacter { .. })
        ));
    }

    #[test]
    fn game_code_parts() {
        let code: GameCode = "NSuE".parse().unwrap();
        assert_eq!(code.category(), Some(Category::GamePak));
        assert_eq!(code.unique_code(), "Su");
        assert_eq!(code.destination(), Some(Destination::NorthAmerica));
        assert_eq!(code.destination().unwrap().to_string(), "North America");

        let unknown = GameCode::new("QxxQ").unwrap();
        assert_eq!(unknown.category(), None);
        assert_eq!(unknown.destination(), None);
    }

    #[test]
    fn codes_are_unique() {
        for (i, a) in Category::VARIANTS.iter().enumerate() {
            for b in &Category::VARIANTS[i + 1..] {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?}");
            }
        }

        for (i, a) in Destination::VARIANTS.iter().enumerate() {
            for b in &Destination::VARIANTS[i + 1..] {
                assert_ne!(a.code(), b.code(), "{a:?} and {b:?}");
            }
        }
    }

    #[test]
    fn generate_overwrites_existing_file() {
        let path = scratch("overwrite").join("header.bin");
        std::fs::write(&path, vec![0xFF; 1000]).unwrap();

        generate(&path, &summer()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, summer().to_bytes().unwrap());
    }

    #[test]
    fn generate_into_missing_directory_fails() {
        let path = scratch("missing-dir").join("nope").join("header.bin");

        let err = generate(&path, &summer()).unwrap_err();
        assert!(matches!(err, HeaderError::Io { .. }));
    }

    #[test]
    fn reads_header_from_rom() {
        let path = scratch("read-rom").join("rom.z64");
        let header = Header::new(Title::new("Raku").unwrap(), GameCode::new("NRkP").unwrap());

        let mut rom = header.to_bytes().unwrap();
        rom.extend(vec![0xAA; 0x1000]);
        std::fs::write(&path, &rom).unwrap();

        let read = Header::read_from_path(&path).unwrap();
        assert_eq!(read, header);
        assert_eq!(read.title.text(), "Raku");
        assert_eq!(read.game_code.destination(), Some(Destination::Europe));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let path = scratch("truncated").join("header.bin");
        std::fs::write(&path, [0x80, 0x37, 0x12, 0x40]).unwrap();

        let err = Header::read_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::Truncated {
                len: 4,
                expected: 64,
                ..
            }
        ));
    }
}
