use bytesize::ByteSize;
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use eyre_pretty::{Context, Result};
use romfmt::{
    KERNEL_OFFSET,
    boot::{BOOT_IMAGE_SIZE, BootImage},
    header::Header,
};
use std::path::{Path, PathBuf};

fn properties_table() -> Table {
    let mut properties = Table::new();
    properties
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Property").set_alignment(CellAlignment::Center),
            Cell::new("Value").set_alignment(CellAlignment::Center),
        ]);

    properties
}

fn info_table(input: &Path, len: u64) -> Table {
    let mut info = Table::new();
    info.load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(format!(
            "{} ({})",
            input.display(),
            ByteSize(len).display()
        ))]);

    info
}

fn maybe(value: Option<impl std::fmt::Display>) -> String {
    value
        .map(|x| x.to_string())
        .unwrap_or("<unknown>".to_owned())
}

pub fn inspect_header(input: PathBuf) -> Result<()> {
    let meta = std::fs::metadata(&input).context("opening file")?;
    let header = Header::read_from_path(&input).context("parsing rom header")?;

    let mut properties = properties_table();
    properties.add_row(vec![
        Cell::new("PI Configuration"),
        Cell::new(format!("0x{:08X}", header.pi_config)),
    ]);

    properties.add_row(vec![
        Cell::new("Clock Rate"),
        Cell::new(format!("0x{:08X}", header.clock_rate)),
    ]);

    properties.add_row(vec![
        Cell::new("Boot Address"),
        Cell::new(format!("0x{:08X}", header.boot_address)),
    ]);

    properties.add_row(vec![
        Cell::new("Release"),
        Cell::new(format!("0x{:08X}", header.release)),
    ]);

    properties.add_row(vec![
        Cell::new("Check Code"),
        Cell::new(format!("0x{:016X}", header.check_code)),
    ]);

    properties.add_row(vec![
        Cell::new("Title"),
        Cell::new(format!("{:?}", header.title)),
    ]);

    properties.add_row(vec![
        Cell::new("Game Code"),
        Cell::new(header.game_code.to_string()),
    ]);

    properties.add_row(vec![
        Cell::new("Category"),
        Cell::new(maybe(header.game_code.category())),
    ]);

    properties.add_row(vec![
        Cell::new("Unique Code"),
        Cell::new(header.game_code.unique_code()),
    ]);

    properties.add_row(vec![
        Cell::new("Destination"),
        Cell::new(maybe(header.game_code.destination())),
    ]);

    properties.add_row(vec![
        Cell::new("ROM Version"),
        Cell::new(format!("0x{:02X}", header.rom_version)),
    ]);

    println!("{}", info_table(&input, meta.len()));
    println!("{properties}");

    Ok(())
}

pub fn inspect_boot_image(input: PathBuf) -> Result<()> {
    let image = BootImage::read_from_path(&input).context("parsing boot image")?;
    let code_len = image.code_len();

    let mut properties = properties_table();
    properties.add_row(vec![
        Cell::new("Boot Code"),
        Cell::new(format!(
            "0x{:04X} ({})",
            code_len,
            ByteSize(code_len as u64)
        )),
    ]);

    properties.add_row(vec![
        Cell::new("Padding"),
        Cell::new(format!(
            "0x{:04X} ({})",
            image.section.len() - code_len,
            ByteSize((image.section.len() - code_len) as u64)
        )),
    ]);

    properties.add_row(vec![
        Cell::new("Kernel Size"),
        Cell::new(format!(
            "0x{:08X} ({})",
            image.trailer.kernel_size,
            ByteSize(image.trailer.kernel_size as u64)
        )),
    ]);

    properties.add_row(vec![
        Cell::new("Reserved"),
        Cell::new(format!("0x{:08X}", image.trailer.reserved)),
    ]);

    properties.add_row(vec![
        Cell::new("Kernel Offset"),
        Cell::new(format!("0x{KERNEL_OFFSET:08X}")),
    ]);

    println!("{}", info_table(&input, BOOT_IMAGE_SIZE as u64));
    println!("{properties}");

    Ok(())
}
