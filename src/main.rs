use clap::Parser;
use std::path::PathBuf;

use ooxml_postprocess::{DocxOptions, PptxOptions, TocStrategy};

#[derive(Parser)]
#[command(
    name = "ooxml-postprocess",
    about = "Fix up converter-generated DOCX/PPTX files"
)]
struct Args {
    /// Input DOCX or PPTX file
    input: PathBuf,
    /// Output file (defaults to rewriting the input in place)
    output: Option<PathBuf>,
    /// Paper size for every DOCX section (A3, A4, A5, B4, B5, JIS_B4, JIS_B5, Letter, Legal, Ledger)
    #[arg(long)]
    paper_size: Option<String>,
    /// Page orientation for every DOCX section (portrait or landscape)
    #[arg(long)]
    orientation: Option<String>,
    /// PPTX slide size (16:9, WIDESCREEN, 4:3, LETTER, LEDGER, A4, A3)
    #[arg(long)]
    slide_size: Option<String>,
    /// How TOC insertion points are found: placeholders or hyperlinks
    #[arg(long, default_value = "placeholders")]
    toc_strategy: TocStrategy,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("Error: file not found: {}", args.input.display());
        std::process::exit(1);
    }
    if !args.input.is_file() {
        eprintln!("Error: not a file: {}", args.input.display());
        std::process::exit(1);
    }

    let docx_options =
        match DocxOptions::from_names(args.paper_size.as_deref(), args.orientation.as_deref()) {
            Ok(opts) => DocxOptions {
                toc_strategy: args.toc_strategy,
                ..opts
            },
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        };
    let pptx_options = match PptxOptions::from_name(args.slide_size.as_deref()) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let output = args.output.unwrap_or_else(|| args.input.clone());

    if let Err(e) =
        ooxml_postprocess::postprocess_file(&args.input, &output, &docx_options, &pptx_options)
    {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
