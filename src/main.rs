use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use hsf_scene::{ByteOrder, LoadOptions, load_model_with};
use memmap2::Mmap;
use rayon::prelude::*;
use rootcause::prelude::*;
use tracing_subscriber::EnvFilter;

/// Load HSF scene files and print what they contain
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Files are little-endian instead of the usual big-endian
    #[clap(long)]
    little_endian: bool,

    /// Accept files with more than one parentless object
    #[clap(long)]
    lenient_root: bool,

    /// Dump each model as JSON instead of a summary
    #[clap(long)]
    json: bool,

    /// .hsf file(s)
    files: Vec<PathBuf>,
}

fn map_file(path: &Path) -> Result<Mmap, Report> {
    let file = File::open(path).context("Failed to open HSF file")?;
    let mmap = unsafe { Mmap::map(&file) }.context("Failed to map HSF file")?;
    Ok(mmap)
}

fn main() -> Result<(), Report> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let options = LoadOptions::builder()
        .byte_order(if args.little_endian {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        })
        .strict_root(!args.lenient_root)
        .build();

    let maps = args.files.iter().map(|path| map_file(path)).collect::<Result<Vec<_>, _>>()?;

    let models: Vec<_> = maps.par_iter().map(|map| load_model_with(&map[..], &options)).collect();

    let mut failed = 0;
    for (path, model) in args.files.iter().zip(models) {
        let model = match model {
            Ok(model) => model,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                failed += 1;
                continue;
            }
        };

        if args.json {
            println!("{}", serde_json::to_string_pretty(&model).context("Failed to serialize model")?);
        } else {
            println!("{}", path.display());
            model.print_summary();
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} files failed to load", args.files.len());
        std::process::exit(1);
    }

    Ok(())
}
