use clap::Parser;
use contactsim_rs::Result;
use contactsim_rs::dgs::{self, EncodeStats};
use contactsim_rs::trace::{self, CoalesceOpts, DEFAULT_ZERO_DURATION_PAD};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "contacts-to-dgs",
    about = "Compile a pairwise contact trace into a DGS event stream"
)]
struct Args {
    /// Path to the tab-separated contact trace
    #[arg(long)]
    contacts: PathBuf,

    /// Output DGS file; defaults to stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Graph name written to the DGS header
    #[arg(long, default_value = "contacts")]
    graph_name: String,

    /// Offset added to the end of zero-duration contacts
    #[arg(long, default_value_t = DEFAULT_ZERO_DURATION_PAD)]
    zero_duration_pad: u64,
}

fn run(args: Args) -> Result<EncodeStats> {
    let records = trace::read_contacts(&args.contacts)?;
    let opts = CoalesceOpts {
        zero_duration_pad: args.zero_duration_pad,
    };
    let stream = trace::coalesce(&records, &opts)?;

    let stats = match &args.out {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            let stats = dgs::encode(&stream, &args.graph_name, &mut out)?;
            out.flush()?;
            info!(path = %path.display(), "已写入 DGS 文件");
            stats
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let stats = dgs::encode(&stream, &args.graph_name, &mut out)?;
            out.flush()?;
            stats
        }
    };
    Ok(stats)
}

fn main() -> ExitCode {
    // 日志写到 stderr，stdout 留给 DGS 输出
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(stats) => {
            eprintln!(
                "steps={} events={} edges={}",
                stats.steps, stats.events, stats.edges
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "编译失败");
            ExitCode::FAILURE
        }
    }
}
