use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vypiskalib::config::SourceConfig;
use vypiskalib::importer::Importer;
use vypiskalib::sources;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    /// Показать, какой источник опознаёт каждый файл
    Identify,
    /// Извлечь канонические записи
    Extract,
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SourceKind {
    Revolut,
    N26,
    Paypal,
    Caixabank,
}

/// Реестр источников: институт + его конфигурация.
#[derive(Deserialize)]
struct Registry {
    sources: Vec<SourceEntry>,
}

#[derive(Deserialize)]
struct SourceEntry {
    kind: SourceKind,
    #[serde(flatten)]
    config: SourceConfig,
}

#[derive(Parser, Debug)]
#[command(name = "vypiska", version, about = "Импорт банковских выписок в записи двойной записи")]
struct Cli {
    /// Реестр источников (JSON)
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Режим работы
    #[arg(long = "mode", value_enum, default_value_t = Mode::Extract)]
    mode: Mode,

    /// Файлы выписок
    files: Vec<PathBuf>,
}

fn build_importer(entry: SourceEntry) -> Importer {
    match entry.kind {
        SourceKind::Revolut => sources::revolut(entry.config),
        SourceKind::N26 => sources::n26(entry.config),
        SourceKind::Paypal => sources::paypal(entry.config),
        SourceKind::Caixabank => sources::caixabank(entry.config),
    }
}

/// Первый источник, опознавший файл; ошибки пробы не валят весь прогон.
fn claim(importers: &mut [Importer], file: &Path) -> Option<usize> {
    for (i, importer) in importers.iter_mut().enumerate() {
        match importer.identify(file) {
            Ok(true) => return Some(i),
            Ok(false) => {}
            Err(e) => eprintln!("{}: {} probe failed: {e}", file.display(), importer.name()),
        }
    }
    None
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading registry {}", cli.config.display()))?;
    let registry: Registry = serde_json::from_str(&text).context("parsing registry")?;
    let mut importers: Vec<Importer> = registry.sources.into_iter().map(build_importer).collect();

    let mut failures = 0usize;
    for file in &cli.files {
        let Some(i) = claim(&mut importers, file) else {
            match cli.mode {
                Mode::Identify => println!("{}: unrecognized", file.display()),
                Mode::Extract => eprintln!("{}: unrecognized, skipped", file.display()),
            }
            continue;
        };

        match cli.mode {
            Mode::Identify => println!("{}: {}", file.display(), importers[i].name()),
            Mode::Extract => match importers[i].extract(file) {
                Ok(entries) => {
                    for entry in entries {
                        println!("{entry}");
                    }
                }
                // файл с ошибкой не даёт ни одной записи
                Err(e) => {
                    eprintln!("{}: {e}", file.display());
                    failures += 1;
                }
            },
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed to extract");
    }
    Ok(())
}
