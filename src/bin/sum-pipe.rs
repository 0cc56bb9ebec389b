use std::{
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;

use sumpipe::{
    digest::HashAlgorithm,
    input::{open_input, Compression},
    output::{is_stdout, open_output, OutputMode},
    pipeline::{Delimiter, Pipeline, PipelineConfig, PipelineCounters},
    stream::ParseOptions,
    tee::TeeReader,
};

/// Consumes a tar stream and writes sums of its files in triage format, passing the archive
/// through to stdout unchanged.
///
/// tar -c ./ | sum-pipe -o tar_sums.out | mbuffer -m2G -P90 -o /dev/nst0
#[derive(Debug, Parser)]
#[clap(name = "sum-pipe", version)]
pub struct App {
    /// Input tar file ("-" for stdin)
    #[clap(short = 'f', long, default_value = "-")]
    input: PathBuf,

    /// Where to write sum data ("-" for stdout)
    #[clap(
        short,
        long,
        required_unless_present_any = ["list_available_hashes", "drain_only"],
        conflicts_with = "drain_only"
    )]
    output: Option<PathBuf>,

    /// Consume the tar stream instead of passing it through to stdout
    #[clap(long)]
    sink: bool,

    /// Terminate records with NUL instead of newline
    #[clap(short = '0', long)]
    null: bool,

    /// Gzip decompress the input
    #[clap(short = 'g', long, group = "compression")]
    gzip: bool,
    /// Bzip2 decompress the input
    #[clap(short = 'j', long, group = "compression")]
    bzip2: bool,
    /// Zstd decompress the input
    #[clap(long, group = "compression")]
    zstd: bool,

    /// Hash algorithm
    #[clap(long, value_enum, default_value_t = HashAlgorithm::Sha256)]
    algo: HashAlgorithm,

    /// Truncate an existing sum file
    #[clap(long, alias = "overwrite_sum", conflicts_with = "append")]
    overwrite_sum: bool,
    /// Append to an existing sum file
    #[clap(short, long)]
    append: bool,

    /// Keep reading past zero blocks (concatenated archives)
    #[clap(long)]
    ignore_zeros: bool,
    /// Fail if the input ends inside a header block
    #[clap(long)]
    strict_eof: bool,

    /// Read the archive without computing or writing sums (no --output)
    #[clap(long)]
    drain_only: bool,

    /// Print the available hash algorithms and exit
    #[clap(long)]
    list_available_hashes: bool,
}

impl App {
    fn compression(&self) -> Compression {
        if self.gzip {
            Compression::Gzip
        } else if self.bzip2 {
            Compression::Bzip2
        } else if self.zstd {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    fn output_mode(&self) -> OutputMode {
        if self.append {
            OutputMode::Append
        } else if self.overwrite_sum {
            OutputMode::Overwrite
        } else {
            OutputMode::CreateNew
        }
    }

    /// Opens the sum output, or `None` when no sums are written.
    ///
    /// Called before any input is read, so an existing sum file fails the run up front.
    fn open_sink(&self) -> Result<Option<Box<dyn Write>>> {
        if self.drain_only {
            return Ok(None);
        }

        let output: &Path = self.output.as_deref().context("--output is required")?;
        if !self.sink && is_stdout(output) {
            bail!("Sums can't go to stdout while the archive is passed through to stdout (use --sink or another --output)");
        }
        Ok(Some(open_output(output, self.output_mode())?))
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(PipelineConfig {
            algorithm: self.algo,
            delimiter: if self.null {
                Delimiter::Null
            } else {
                Delimiter::Newline
            },
            parse: ParseOptions {
                ignore_zeros: self.ignore_zeros,
                strict_eof: self.strict_eof,
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

fn process(
    args: &App,
    pipeline: &Pipeline,
    reader: impl Read,
    sink: Option<impl Write>,
) -> Result<PipelineCounters> {
    let reader = args
        .compression()
        .wrap(reader)
        .context("Setting up decompression")?;

    match sink {
        Some(sink) => pipeline.run(reader, sink),
        None => pipeline.drain(reader),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = App::parse();

    if args.list_available_hashes {
        for algorithm in HashAlgorithm::ALL {
            println!("{algorithm}");
        }
        return Ok(());
    }

    let sink = args.open_sink()?;
    let input = open_input(&args.input)?;
    let pipeline = args.pipeline();

    let counters = if args.sink {
        process(&args, &pipeline, input, sink)?
    } else {
        let mut tee = TeeReader::new(input, BufWriter::new(io::stdout().lock()));
        let counters = process(&args, &pipeline, &mut tee, sink)?;

        // whatever follows the end of the archive still goes downstream
        io::copy(&mut tee, &mut io::sink()).context("Passing the rest of the input through")?;
        tee.flush().context("Flushing passthrough output")?;
        counters
    };

    if counters.files_skipped > 0 {
        eprintln!("Warning: Skipped {} (non-files)", counters.files_skipped);
    }
    if counters.malformed > 0 {
        eprintln!("Warning: Skipped {} (bad headers)", counters.malformed);
    }
    eprintln!("{counters}");

    Ok(())
}
