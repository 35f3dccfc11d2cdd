use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pdf_repair::RepairOptions;

/// Rewrite every page content stream of a PDF in canonical syntax
#[derive(Parser, Debug)]
#[command(name = "pdf-repair", version, about = "Rewrite PDF page content streams in canonical syntax")]
struct Args {
    /// PDF document to read
    input: PathBuf,
    /// Where to write the repaired document
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = RepairOptions::from_env();
    match pdf_repair::repair_file(&args.input, &args.output, &options) {
        Ok(report) => {
            if !report.is_clean() {
                log::warn!("{} page(s) kept their original content", report.failures().count());
            }
            println!("Done.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
