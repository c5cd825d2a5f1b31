mod inspect;

use clap::{Parser, Subcommand};
use eyre_pretty::{Context, Result};
use romfmt::{
    boot::{self, Padding},
    header::{self, GameCode, Header, Title},
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Subcommand)]
enum Command {
    /// Pad a boot section with zeroes to fill the IPL3 region after the ROM header.
    ///
    /// The file is rewritten in place, and only if it needs padding.
    PadBootSection {
        /// Path to the boot section binary
        boot_section: PathBuf,
    },
    /// Pad a bootloader and append the size of the kernel to it.
    FinalizeBootImage {
        /// Path to the bootloader binary, modified in place
        bootloader: PathBuf,
        /// Path to the kernel ELF
        kernel_elf: PathBuf,
    },
    /// Generate a ROM header blob.
    GenerateRomHeader {
        /// Path to the output file
        #[arg(short, long, default_value = "target/header.bin")]
        output: PathBuf,
        /// Game title, at most 20 ASCII characters
        #[arg(long, default_value = header::DEFAULT_TITLE)]
        title: Title,
        /// Game code: category, two character unique code and destination
        #[arg(long, default_value = header::DEFAULT_GAME_CODE)]
        game_code: GameCode,
    },
    /// Print the fields of a ROM header.
    ///
    /// Accepts either a bare header or a whole ROM.
    InspectHeader {
        /// Path to the input file
        input: PathBuf,
    },
    /// Print the layout of a finalized boot image.
    InspectBootImage {
        /// Path to the input file
        input: PathBuf,
    },
}

/// Build tooling for the Raku N64 cartridge ROM.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Action to take
    #[command(subcommand)]
    command: Command,
}

fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("romtool=info,romfmt=warn"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(env_filter)
        .init();
}

fn pad_boot_section(boot_section: PathBuf) -> Result<()> {
    let padding = boot::pad_boot_section(&boot_section).context("padding boot section")?;
    if let Padding::Padded { added } = padding {
        println!("Padding {} with {added} bytes", boot_section.display());
    }

    Ok(())
}

fn finalize_boot_image(bootloader: PathBuf, kernel_elf: PathBuf) -> Result<()> {
    let finalized =
        boot::finalize_boot_image(&bootloader, &kernel_elf).context("finalizing boot image")?;

    if let Padding::Padded { added } = finalized.padding {
        println!("Padding {} with {added} bytes", bootloader.display());
    }

    let size = finalized.kernel_size;
    println!("Kernel size: {size} (0x{size:08X})");

    Ok(())
}

fn generate_rom_header(output: PathBuf, title: Title, game_code: GameCode) -> Result<()> {
    let header = Header::new(title, game_code);
    header::generate(&output, &header)
        .context(format!("writing rom header to {}", output.display()))?;

    info!("wrote rom header for {title} ({game_code}) to {}", output.display());

    Ok(())
}

fn main() -> Result<()> {
    eyre_pretty::install()?;
    setup_tracing();

    let args = Args::parse();
    match args.command {
        Command::PadBootSection { boot_section } => pad_boot_section(boot_section),
        Command::FinalizeBootImage {
            bootloader,
            kernel_elf,
        } => finalize_boot_image(bootloader, kernel_elf),
        Command::GenerateRomHeader {
            output,
            title,
            game_code,
        } => generate_rom_header(output, title, game_code),
        Command::InspectHeader { input } => inspect::inspect_header(input),
        Command::InspectBootImage { input } => inspect::inspect_boot_image(input),
    }
}
