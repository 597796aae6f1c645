//! emufs command-line tool.
//!
//! Usage:
//!   emufs disk.devz ls /code
//!   emufs disk.devz cat /code/main.js
//!   emufs disk.devz import ./src /code --output patched.devz
//!   emufs --create new.devz mkdir /code

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use emufs::{Archive, DirBlobStore, EmuFs, EmuFsConfig};

/// Inspect and edit the inode filesystem inside an emulator disk archive.
#[derive(Parser, Debug)]
#[command(name = "emufs")]
#[command(about = "Inspect and edit emulator disk archives")]
struct Cli {
    /// Archive to operate on
    archive: PathBuf,

    /// Start from an empty filesystem instead of reading the archive
    #[arg(long)]
    create: bool,

    /// Write changes here instead of back to the archive
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls { path: String },
    /// Show inode metadata
    Stat { path: String },
    /// Walk a subtree
    Walk {
        #[arg(default_value = "/")]
        path: String,
        /// Yield directories after their contents
        #[arg(long)]
        bottom_up: bool,
    },
    /// Print a file to stdout
    Cat { path: String },
    /// Create a directory
    Mkdir { path: String },
    /// Remove a file or empty directory
    Rm { path: String },
    /// Remove a subtree
    Rmtree { path: String },
    /// Set permission bits (octal)
    Chmod {
        path: String,
        #[arg(value_parser = parse_octal)]
        mode: u16,
    },
    /// Copy a host file in
    Put { host: PathBuf, path: String },
    /// Replace a directory's contents with a host directory tree
    Import { host: PathBuf, path: String },
    /// Report orphaned blobs and size mismatches
    Check,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Mkdir { .. }
                | Command::Rm { .. }
                | Command::Rmtree { .. }
                | Command::Chmod { .. }
                | Command::Put { .. }
                | Command::Import { .. }
        )
    }
}

fn parse_octal(s: &str) -> Result<u16, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    u16::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode {s:?}: {e}"))
}

fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EmuFsConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EmuFsConfig::default(),
    };

    let archive = if cli.create {
        Archive::create(config)?
    } else {
        Archive::open(&cli.archive, config)
            .with_context(|| format!("opening {}", cli.archive.display()))?
    };

    let code = run(archive.fs(), &cli.command)?;

    if cli.command.mutates() || cli.create {
        let dest = cli.output.as_deref().unwrap_or(cli.archive.as_path());
        tracing::info!(dest = %dest.display(), "saving archive");
        archive
            .save(dest)
            .with_context(|| format!("saving {}", dest.display()))?;
    }
    archive.close()?;
    Ok(code)
}

fn run(fs: &EmuFs<DirBlobStore>, command: &Command) -> Result<ExitCode> {
    tracing::debug!(?command, "running");
    let mut out = std::io::stdout().lock();
    match command {
        Command::Ls { path } => {
            for name in fs.listdir(path)? {
                let child = Path::new(path).join(&name);
                let is_dir = fs.stat(&child)?.is_some_and(|s| s.is_dir());
                writeln!(out, "{name}{}", if is_dir { "/" } else { "" })?;
            }
        }
        Command::Stat { path } => {
            let Some(stat) = fs.stat(path)? else {
                bail!("{path}: no such file or directory");
            };
            writeln!(out, "inode: {}", stat.ino)?;
            writeln!(out, "kind:  {}", if stat.is_dir() { "directory" } else { "file" })?;
            writeln!(out, "mode:  {:o}", stat.mode)?;
            writeln!(out, "size:  {}", stat.size)?;
            writeln!(out, "atime: {}", stat.atime)?;
            writeln!(out, "mtime: {}", stat.mtime)?;
            writeln!(out, "ctime: {}", stat.ctime)?;
        }
        Command::Walk { path, bottom_up } => {
            for entry in fs.walk(path, !bottom_up)? {
                let entry = entry?;
                writeln!(
                    out,
                    "{} dirs={:?} files={:?}",
                    entry.path.display(),
                    entry.dirs,
                    entry.files
                )?;
            }
        }
        Command::Cat { path } => {
            out.write_all(&fs.read_file(path)?)?;
        }
        Command::Mkdir { path } => {
            fs.mkdir(path)?;
        }
        Command::Rm { path } => {
            fs.unlink(path)?;
        }
        Command::Rmtree { path } => {
            fs.remove_tree(path)?;
        }
        Command::Chmod { path, mode } => {
            fs.chmod(path, *mode)?;
        }
        Command::Put { host, path } => {
            let data =
                std::fs::read(host).with_context(|| format!("reading {}", host.display()))?;
            fs.write_file(path, &data)?;
        }
        Command::Import { host, path } => {
            let summary = fs
                .import_tree(host, path)
                .with_context(|| format!("importing {} into {path}", host.display()))?;
            writeln!(
                out,
                "imported {} directories, {} files into {path}",
                summary.dirs, summary.files
            )?;
            if summary.skipped > 0 {
                writeln!(out, "skipped {} special files", summary.skipped)?;
            }
        }
        Command::Check => {
            let report = fs.check()?;
            for key in &report.orphans {
                writeln!(out, "orphan blob: {key}")?;
            }
            for m in &report.size_mismatches {
                writeln!(
                    out,
                    "size mismatch: {} recorded {} actual {}",
                    m.path.display(),
                    m.recorded,
                    m.actual
                )?;
            }
            for path in &report.dangling {
                writeln!(out, "dangling entry: {}", path.display())?;
            }
            for path in &report.repeated {
                writeln!(out, "inode reached twice: {}", path.display())?;
            }
            writeln!(out, "{} inodes checked", report.inodes)?;
            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_octal() {
        assert_eq!(parse_octal("644"), Ok(0o644));
        assert_eq!(parse_octal("0o000"), Ok(0));
        assert!(parse_octal("9").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli =
            Cli::try_parse_from(["emufs", "disk.devz", "walk", "/code", "--bottom-up"]).unwrap();
        assert!(matches!(cli.command, Command::Walk { bottom_up: true, .. }));
        assert!(!cli.command.mutates());

        let cli =
            Cli::try_parse_from(["emufs", "-o", "out.devz", "disk.devz", "chmod", "/f", "000"])
                .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.devz")));
        assert!(cli.command.mutates());
    }

    #[test]
    fn test_run_against_fresh_archive() {
        let archive = Archive::create(EmuFsConfig::default()).unwrap();
        let fs = archive.fs();
        run(fs, &Command::Mkdir { path: "/d".into() }).unwrap();
        assert_eq!(fs.listdir("/").unwrap(), vec!["d"]);
        run(fs, &Command::Check).unwrap();
        assert!(run(fs, &Command::Stat { path: "/nope".into() }).is_err());
    }
}
