//! pdf2json - Dump a PDF's object tree as JSON
//!
//! Parses the raw byte stream of a PDF file and writes the resulting tree
//! as pretty-printed JSON, optionally externalizing stream payloads first.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pdfscope_core::document::StreamOutcome;
use pdfscope_core::{
    DecompressOptions, Document, NoopSink, ParseOptions, PdfError, TraceEvent, TraceSink,
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdf2json")]
#[command(author, version, about = "Dump a PDF's object tree as JSON", long_about = None)]
struct Args {
    /// Path to the PDF file
    input: PathBuf,

    /// Path to the JSON output (defaults to the input with a .json extension)
    output: Option<PathBuf>,

    /// Write stream payloads to files before converting
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    decompress: bool,

    /// Directory for decompressed payloads (defaults to <input stem>_decompressed)
    #[arg(short = 'O', long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Print node events to stderr while parsing
    #[arg(short = 't', long, action = ArgAction::SetTrue)]
    trace: bool,
}

/// Prints non-trivial node events to stderr.
struct StderrSink;

impl TraceSink for StderrSink {
    fn node_opened(&mut self, event: &TraceEvent) {
        if !event.trivial {
            eprintln!("{}", event.render());
        }
    }

    fn node_closed(&mut self, event: &TraceEvent) {
        if !event.trivial {
            eprintln!("{}", event.render());
        }
    }
}

fn default_out_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}_decompressed"))
}

fn load(args: &Args) -> pdfscope_core::Result<Document> {
    let reader = BufReader::new(File::open(&args.input)?);
    let options = ParseOptions::default();
    if args.trace {
        Document::from_reader_with_sink(reader, options, StderrSink)
    } else {
        Document::from_reader_with_sink(reader, options, NoopSink)
    }
}

fn run(args: &Args) -> Result<()> {
    let mut doc = match load(args) {
        Ok(doc) => doc,
        Err(PdfError::Parse(failure)) => {
            eprintln!("Error: {failure}");
            for note in failure.notes() {
                eprintln!("  {note}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", args.input.display()));
        }
    };

    if args.decompress {
        let dir = args
            .out_dir
            .clone()
            .unwrap_or_else(|| default_out_dir(&args.input));
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let report = doc.decompress(&DecompressOptions::new(&dir))?;
        for stream in report.skipped() {
            match &stream.outcome {
                StreamOutcome::Unsupported(filter) => eprintln!(
                    "Warning: {}: decompressing with filter {filter} is not implemented",
                    stream.reference
                ),
                StreamOutcome::Failed(reason) => {
                    eprintln!("Warning: {}: stream did not decode: {reason}", stream.reference)
                }
                _ => {}
            }
        }
    }

    let (json, warnings) = doc.to_json_with_warnings();
    for warning in &warnings {
        eprintln!("Warning: {warning}");
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("json"));
    let file =
        File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &json)?;
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("Error: File not found: {}", args.input.display());
        std::process::exit(1);
    }

    run(&args)
}
