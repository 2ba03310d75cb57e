//! Export the registration API's OpenAPI document as JSON.
//!
//! `cargo run --bin openapi-dump` prints it; `--out <path>` writes it to a
//! file instead.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thdc_backend::doc::ApiDoc;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(about = "Export the THDC registration OpenAPI document")]
struct Args {
    /// Write the document here instead of to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn export(args: &Args) -> Result<(), String> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .map_err(|err| format!("cannot serialise OpenAPI document: {err}"))?;
    match &args.out {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .map_err(|err| format!("cannot write {}: {err}", path.display())),
        None => writeln!(std::io::stdout().lock(), "{json}")
            .map_err(|err| format!("cannot write to stdout: {err}")),
    }
}

fn main() -> ExitCode {
    match export(&Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = writeln!(std::io::stderr().lock(), "{message}");
            ExitCode::FAILURE
        }
    }
}
