// SPDX-License-Identifier: Apache-2.0
//
// echidna-replay - call-sequence to Foundry replay-test converter
//
// Echidna (and Medusa) print falsified properties as a call sequence:
//
//   FuzzEchidna.pool_deposit(5612,1610) from: 0x... Time delay: 12890 seconds Block delay: 2
//   *wait* Time delay: 100 seconds
//   FuzzEchidna.superPool_accrue(3875,1294549)
//
// This tool converts such a trace into a `test_replay` function body using
// Foundry cheatcodes (vm.prank / vm.warp / vm.roll), so the failing sequence
// can be replayed and debugged under forge.
//
// Usage:
//   echidna-replay <trace.txt> [-o Replay.t.sol]
//   echidna-replay --dir <traces/> [--out-dir <traces/replays/>]
//   cat trace.txt | echidna-replay

mod convert;

use anyhow::{bail, Context, Result};
use clap::Parser;
use convert::{ConvertConfig, ConvertResult, Converter};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "echidna-replay",
    about = "Convert Echidna/Medusa call-sequence traces into Foundry replay test functions",
    version
)]
struct Cli {
    /// Input call-sequence trace (reads stdin if omitted)
    #[arg(value_name = "TRACE")]
    input: Option<PathBuf>,

    /// Output file path (defaults to stdout if not specified)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Convert all .txt traces in a directory
    #[arg(long, value_name = "DIR", conflicts_with = "input")]
    dir: Option<PathBuf>,

    /// Output directory for batch processing (defaults to <dir>/replays/)
    #[arg(long, value_name = "OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Name of the emitted test function
    #[arg(long, default_value = "test_replay")]
    function_name: String,

    /// Verbose output showing conversion details
    #[arg(short, long)]
    verbose: bool,

    /// Dry run: print converted tests without writing files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConvertConfig {
        function_name: cli.function_name.clone(),
    };
    let converter = Converter::new(config);

    if let Some(dir) = &cli.dir {
        process_directory(&converter, dir, &cli)
    } else {
        process_single(&converter, &cli)
    }
}

fn process_single(converter: &Converter, cli: &Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read trace from stdin")?;
            buf
        }
    };

    let result = converter.convert(&source);

    if cli.verbose {
        report(cli.input.as_deref(), &result);
    }

    if cli.dry_run || cli.output.is_none() {
        print!("{}", result.output);
        return Ok(());
    }

    let output_path = cli.output.as_ref().unwrap();
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(output_path, &result.output)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    if cli.verbose {
        eprintln!("Written to: {}", output_path.display());
    }

    Ok(())
}

fn process_directory(converter: &Converter, dir: &Path, cli: &Cli) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a valid directory", dir.display());
    }

    let out_dir = cli.out_dir.clone().unwrap_or_else(|| dir.join("replays"));

    if !cli.dry_run {
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
    }

    let mut total_converted = 0;
    convert_dir_recursive(converter, dir, &out_dir, dir, cli, &mut total_converted)?;

    if cli.verbose || total_converted > 0 {
        eprintln!("Converted {} trace file(s)", total_converted);
    }

    Ok(())
}

fn convert_dir_recursive(
    converter: &Converter,
    current: &Path,
    out_base: &Path,
    src_base: &Path,
    cli: &Cli,
    total_converted: &mut usize,
) -> Result<()> {
    let entries = fs::read_dir(current)
        .with_context(|| format!("failed to read directory {}", current.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            // Skip the output directory to avoid converting our own output
            if path == out_base {
                continue;
            }
            convert_dir_recursive(converter, &path, out_base, src_base, cli, total_converted)?;
        } else if path.extension().is_some_and(|ext| ext == "txt") {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            let result = converter.convert(&source);
            *total_converted += 1;

            if cli.verbose {
                report(Some(&path), &result);
            }

            if cli.dry_run {
                println!("--- {} ---", path.display());
                println!("{}", result.output);
            } else {
                let relative = path.strip_prefix(src_base).unwrap_or(&path);
                let out_path = out_base.join(relative).with_extension("t.sol");

                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                fs::write(&out_path, &result.output)
                    .with_context(|| format!("failed to write {}", out_path.display()))?;
            }
        }
    }

    Ok(())
}

fn report(path: Option<&Path>, result: &ConvertResult) {
    let name = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());
    eprintln!("--- Conversion Report for {} ---", name);
    eprintln!("  Calls emitted: {}", result.calls_emitted);
    eprintln!("  Waits emitted: {}", result.waits_emitted);
    for (line_no, line) in &result.skipped {
        eprintln!("  Skipped line {}: {}", line_no, line.trim());
    }
    eprintln!("---");
}
