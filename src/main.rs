//! Overlay Studio - command line entry point
//!
//! Ingests a batch of images (the first becomes the base unless told
//! otherwise), then writes the composite and optionally per-layer exports.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use overlay_studio::compositor::ExportPayload;
use overlay_studio::ingest;
use overlay_studio::telemetry::{init_logging, LogConfig};
use overlay_studio::{Studio, StudioPreferences};

const USAGE: &str = "Usage: overlay-studio [--out DIR] [--layers] [--json] FILE...";

/// Parsed command line
#[derive(Debug, Default)]
struct CliArgs {
    out_dir: Option<PathBuf>,
    layer_exports: bool,
    json: bool,
    files: Vec<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" | "-o" => match args.next() {
                Some(dir) => parsed.out_dir = Some(PathBuf::from(dir)),
                None => return Err("--out needs a directory".to_string()),
            },
            "--layers" => parsed.layer_exports = true,
            "--json" => parsed.json = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("Unknown option {}", flag)),
            file => parsed.files.push(PathBuf::from(file)),
        }
    }
    if parsed.files.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

async fn write_payload(dir: &Path, payload: &ExportPayload) -> std::io::Result<PathBuf> {
    let path = dir.join(&payload.filename);
    tokio::fs::write(&path, &payload.bytes).await?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), payload.bytes.len());
    Ok(path)
}

/// Render every requested export. Returns the written paths.
async fn run(
    studio: &Studio,
    args: &CliArgs,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out_dir).await?;

    let mut payloads = Vec::new();
    if let Some(composite) = studio.export_composite()? {
        payloads.push(composite);
    }
    if args.layer_exports {
        for id in studio.layers().ids() {
            payloads.extend(studio.export_layer_crop(id)?);
            payloads.extend(studio.export_layer_transformed(id)?);
        }
    }

    let mut written = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        written.push(write_payload(out_dir, payload).await?);
    }
    Ok(written)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = match init_logging(&LogConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    let mut prefs = StudioPreferences::load();
    let out_dir = args
        .out_dir
        .clone()
        .or_else(|| prefs.get_last_export_dir())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut studio = Studio::with_preferences(prefs.clone());
    let report = studio.apply_ingested(ingest::ingest_paths(&args.files).await);
    if !studio.has_base() {
        tracing::error!("No usable base image among {} file(s)", args.files.len());
        return ExitCode::FAILURE;
    }
    tracing::info!(
        layers = report.added.len(),
        failed = report.failed.len(),
        "Ingested batch"
    );

    let written = match run(&studio, &args, &out_dir).await {
        Ok(written) => written,
        Err(e) => {
            tracing::error!("Export failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.out_dir.is_some() {
        prefs.set_last_export_dir(&out_dir);
        if let Err(e) = prefs.save() {
            tracing::warn!("Failed to save preferences: {}", e);
        }
    }

    if args.json {
        let summary = serde_json::json!({
            "frame": studio.preview_frame(),
            "written": written,
            "failed": report.failed.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                tracing::error!("Failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if report.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--out", "dist", "--layers", "base.jpg", "logo.png"]).unwrap();
        assert_eq!(parsed.out_dir, Some(PathBuf::from("dist")));
        assert!(parsed.layer_exports);
        assert!(!parsed.json);
        assert_eq!(parsed.files.len(), 2);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["--out"]).is_err());
        assert!(args(&["--bogus", "a.png"]).is_err());
    }
}
