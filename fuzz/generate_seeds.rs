//! Generate seed corpus for fuzzing

use std::fs;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn write_seed(
    path: &str,
    entries: &[(&str, &[u8])],
    method: CompressionMethod,
) -> zip::result::ZipResult<()> {
    let options = || SimpleFileOptions::default().compression_method(method);
    let mut writer = ZipWriter::new(fs::File::create(path)?);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options())?;
        } else {
            writer.start_file(*name, options())?;
            writer.write_all(data)?;
        }
    }
    writer.finish()?;
    println!("✓ Generated: {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Seed 1: Empty archive (no files)
    write_seed(&format!("{}/seed_empty.zip", corpus_dir), &[], CompressionMethod::Stored)?;

    // Seed 2: Single small file
    write_seed(
        &format!("{}/seed_single_small.zip", corpus_dir),
        &[("test.txt", b"Hello, World!")],
        CompressionMethod::Stored,
    )?;

    // Seed 3: Nested folders, deflated
    write_seed(
        &format!("{}/seed_nested.zip", corpus_dir),
        &[
            ("a.txt", b"alpha"),
            ("dir/", b""),
            ("dir/b.txt", b"beta"),
            ("dir/sub/c.txt", b"gamma"),
        ],
        CompressionMethod::Deflated,
    )?;

    println!("Seed corpus generation complete");
    Ok(())
}
