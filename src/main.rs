use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lcw::{AssetPack, Format, Operation, Operations};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)]
struct Arguments {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress a single file into a raw LCW stream
    Compress {
        input: PathBuf,

        /// Output path, defaults to the input with an added `.lcw` extension
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Decompress a single raw LCW stream
    Decompress {
        input: PathBuf,

        /// The uncompressed size. The stream does not record it, so it has to be supplied
        #[arg(short, long)]
        size: usize,

        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Compress several files into a pack with a TOML manifest next to it
    Pack {
        files: Vec<PathBuf>,

        /// The pack file to write, the manifest is written to `<out>.toml`
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Extract and verify every asset of a pack
    Unpack {
        pack: PathBuf,

        /// The manifest describing the pack, defaults to `<pack>.toml`
        #[arg(short = 'm', long)]
        manifest: Option<PathBuf>,

        #[command(flatten)]
        args: UnpackArgs,
    },

    /// List the operations of a stream
    Inspect {
        input: PathBuf,

        /// Where the stream starts inside the file
        #[arg(long, default_value = "0", value_parser = parse_offset)]
        offset: usize,
    },

    /// Try to decompress at every offset of a file. This will return a lot of garbage but can
    /// still be useful for finding streams embedded in larger files
    Scan {
        input: PathBuf,

        #[command(flatten)]
        args: ScanArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct FormatArgs {
    /// Store medium and long copy offsets as distances from the write position instead of
    /// absolute positions
    #[arg(long)]
    relative: bool,
}

impl From<FormatArgs> for Format {
    fn from(args: FormatArgs) -> Self {
        if args.relative {
            Format::relative()
        } else {
            Format::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
struct UnpackArgs {
    /// The output directory to extract the assets to
    #[arg(short, long, default_value = "unpacked")]
    out_dir: PathBuf,

    /// Overwrite the output directory if it already exists
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// The minimum number of decompressed bytes for a stream to be reported
    #[arg(short, long, default_value = "256")]
    threshold: usize,
}

fn parse_offset(value: &str) -> Result<usize, std::num::ParseIntError> {
    match value.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let mut path = path.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    path.into()
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    colog::init();

    match args.command {
        Commands::Compress { input, out, format } => {
            let data = fs::read(&input).with_context(|| "Failed to read input file")?;
            let stream = lcw::compress_with(&data, format.into());

            let out = out.unwrap_or_else(|| with_extension(&input, "lcw"));
            fs::write(&out, &stream).with_context(|| "Failed to write output file")?;

            log::info!(
                "Compressed {} bytes into {} bytes: {}",
                data.len(),
                stream.len(),
                out.display()
            );
        }
        Commands::Decompress {
            input,
            size,
            out,
            format,
        } => {
            let stream = fs::read(&input).with_context(|| "Failed to read input file")?;
            let data = lcw::decompress_with(&stream, size, format.into())
                .with_context(|| format!("Failed to decompress {}", input.display()))?;

            if data.len() != size {
                log::warn!(
                    "Stream decompressed to {} bytes, expected {}",
                    data.len(),
                    size
                );
            }

            let out = out.unwrap_or_else(|| input.with_extension("bin"));
            fs::write(&out, &data).with_context(|| "Failed to write output file")?;

            log::info!("Decompressed {} bytes: {}", data.len(), out.display());
        }
        Commands::Pack { files, out, format } => pack(&files, &out, format.into())?,
        Commands::Unpack {
            pack,
            manifest,
            args,
        } => {
            let manifest = manifest.unwrap_or_else(|| with_extension(&pack, "toml"));
            let pack = AssetPack::open(&pack, &manifest)
                .with_context(|| format!("Failed to load pack with manifest {}", manifest.display()))?;

            unpack(&pack, args)?;
        }
        Commands::Inspect { input, offset } => {
            let data = fs::read(&input).with_context(|| "Failed to read input file")?;
            inspect(&data, offset)?;
        }
        Commands::Scan { input, args } => {
            let data = fs::read(&input).with_context(|| "Failed to read input file")?;
            scan(&data, args);
        }
    }

    Ok(())
}

fn pack(files: &[PathBuf], out: &Path, format: Format) -> anyhow::Result<()> {
    let assets = files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .with_context(|| format!("{} is not a file", path.display()))?
                .to_string_lossy()
                .into_owned();
            let data =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

            Ok((name, data))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let pack = AssetPack::build(assets, format);
    let manifest = pack
        .manifest
        .to_toml_string()
        .with_context(|| "Failed to serialize manifest")?;

    fs::write(out, pack.data()).with_context(|| "Failed to write pack file")?;
    let manifest_path = with_extension(out, "toml");
    fs::write(&manifest_path, manifest).with_context(|| "Failed to write manifest")?;

    log::info!(
        "Packed {} assets ({} bytes) into {} bytes: {}",
        pack.assets().len(),
        pack.manifest.total_uncompressed_len(),
        pack.data().len(),
        out.display()
    );

    Ok(())
}

fn unpack(pack: &AssetPack, args: UnpackArgs) -> anyhow::Result<()> {
    log::info!("Extracting {} assets...", pack.assets().len());

    if args.force && args.out_dir.exists() {
        fs::remove_dir_all(&args.out_dir)
            .with_context(|| "Failed to clean up old output directory")?;
    }
    fs::create_dir(&args.out_dir).with_context(|| "Failed to create output directory")?;

    for asset in pack.assets() {
        let data = pack.extract_asset(asset)?;

        let path = args.out_dir.join(&asset.name);
        fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;

        log::info!("Extracted asset: {}", path.display());
    }

    log::info!("Done!");

    Ok(())
}

fn inspect(data: &[u8], offset: usize) -> anyhow::Result<()> {
    let mut produced = 0usize;

    for entry in Operations::new(data, offset) {
        let (at, operation) = entry.with_context(|| "Failed to read stream")?;

        let produces = match operation {
            Operation::ShortCopy { count, .. } | Operation::MediumCopy { count, .. } => {
                count as usize
            }
            Operation::Literal(count) => count as usize,
            Operation::Fill { count, .. } | Operation::LongCopy { count, .. } => count as usize,
            Operation::End => 0,
        };

        println!("{:#07x} {:#07x} {:?}", at, produced, operation);
        produced += produces;
    }

    log::info!("Stream decompresses to {} bytes", produced);

    Ok(())
}

fn scan(data: &[u8], args: ScanArgs) {
    use indicatif::ProgressBar;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    log::info!("Scanning entire file for streams...");

    let progress = ProgressBar::new(data.len() as u64);
    let found = AtomicUsize::new(0);

    (0..data.len()).into_par_iter().for_each(|offset| {
        progress.inc(1);

        let result = match lcw::Decompressor::new(data, offset).decompress() {
            Ok(result) => result,
            Err(_) => return,
        };

        if result.data.len() < args.threshold {
            return;
        }

        progress.println(format!(
            "Found potential stream of {} bytes at {:#07x}-{:#07x}",
            result.data.len(),
            offset,
            offset + result.bytes_read
        ));

        found.fetch_add(1, Ordering::SeqCst);
    });

    progress.finish_and_clear();
    log::info!(
        "Done! Found {} potential streams",
        found.load(Ordering::SeqCst)
    );
}
