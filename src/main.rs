//! Main entry point for the zipview CLI application.
//!
//! This binary provides a command-line interface for listing and extracting
//! a local ZIP archive, in the style of the standard `unzip` utility.

use anyhow::Result;
use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zipview::{ArchiveView, Cli, Cp437Codec, EntryDescriptor, LoggingObserver, NoopObserver, ZipEntity};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::init();
    }

    let mut archive = if cli.debug {
        ArchiveView::open_with(Path::new(&cli.file), Box::new(Cp437Codec), Box::new(LoggingObserver))?
    } else {
        ArchiveView::open_with(Path::new(&cli.file), Box::new(Cp437Codec), Box::new(NoopObserver))?
    };

    if cli.list || cli.verbose {
        return list_entries(&mut archive, cli.verbose);
    }

    let entities: Vec<ZipEntity> = archive.entities().collect::<zipview::ZipResult<_>>()?;
    let descriptors: Vec<EntryDescriptor> = entities
        .into_iter()
        .filter_map(|e| match e {
            ZipEntity::Entry(d) => Some(d),
            ZipEntity::Comment(_) => None,
        })
        .collect();

    let files_to_extract: Vec<EntryDescriptor> = descriptors
        .into_iter()
        .filter(|e| {
            if e.is_directory() {
                return false;
            }

            if !cli.files.is_empty() {
                let matches = cli.files.iter().any(|f| {
                    if has_glob_chars(f) {
                        glob_match(f, e.name())
                    } else {
                        let basename = Path::new(e.name())
                            .file_name()
                            .map(|s| s.to_string_lossy())
                            .unwrap_or_default();
                        e.name() == f || basename == f.as_str()
                    }
                });
                if !matches {
                    return false;
                }
            }

            if cli
                .exclude
                .iter()
                .any(|x| e.name().contains(x.as_str()) || glob_match(x, e.name()))
            {
                return false;
            }

            true
        })
        .collect();

    let multiple_files = cli.pipe && files_to_extract.len() > 1;
    for descriptor in files_to_extract {
        extract_entity(&mut archive, descriptor, &cli, multiple_files)?;
    }

    Ok(())
}

fn list_entries(archive: &mut ArchiveView, verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entity in archive.entities() {
        let descriptor = match entity? {
            ZipEntity::Comment(text) => {
                if verbose {
                    println!("Archive comment: {text}");
                }
                continue;
            }
            ZipEntity::Entry(d) => d,
        };

        if verbose {
            let modified = descriptor.modified().ok();
            let ratio = compression_ratio(descriptor.compressed_size(), descriptor.uncompressed_size());

            let (date, time) = match modified {
                Some(dt) => (dt.format("%Y-%m-%d").to_string(), dt.format("%H:%M").to_string()),
                None => ("????-??-??".to_string(), "??:??".to_string()),
            };

            println!(
                "{:>10}  {:>10}  {:>4}%  {:>10}  {:>5}  {}",
                descriptor.uncompressed_size(),
                descriptor.compressed_size(),
                ratio,
                date,
                time,
                descriptor.name()
            );

            if !descriptor.is_directory() {
                total_uncompressed += descriptor.uncompressed_size();
                total_compressed += descriptor.compressed_size();
                file_count += 1;
            }
        } else {
            println!("{}", descriptor.name());
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        let total_ratio = compression_ratio(total_compressed, total_uncompressed);
        println!(
            "{:>10}  {:>10}  {:>4}%  {:>21}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

fn compression_ratio(compressed: u64, uncompressed: u64) -> u64 {
    if uncompressed == 0 {
        0
    } else {
        100 - (compressed * 100 / uncompressed)
    }
}

fn extract_entity(archive: &mut ArchiveView, descriptor: EntryDescriptor, cli: &Cli, show_filename: bool) -> Result<()> {
    let name = descriptor.name().to_string();

    if cli.pipe {
        if show_filename {
            println!("--- {name} ---");
        }
        let mut content = descriptor.content(archive)?;
        std::io::copy(&mut content, &mut std::io::stdout())?;
        return Ok(());
    }

    let file_name = if cli.junk_paths {
        Path::new(&name)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.clone())
    } else {
        name.clone()
    };
    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(&file_name),
        None => PathBuf::from(&file_name),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {name} (file exists)");
            }
            return Ok(());
        }
        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {name} (use -o to overwrite)");
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {name}");
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut content = descriptor.content(archive)?;
    let mut out_file = fs::File::create(&output_path)?;
    std::io::copy(&mut content, &mut out_file)?;
    out_file.flush()?;

    Ok(())
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
