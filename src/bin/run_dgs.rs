use clap::Parser;
use contactsim_rs::dgs;
use contactsim_rs::replay::{
    ControlNodeSpec, InstantPacer, MemoryController, Pacer, PacingMode, RealtimePacer,
    ReplayConfig, ReplayEngine, ReplayReport,
};
use contactsim_rs::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "run-dgs",
    about = "Replay a DGS event stream against an in-memory topology controller"
)]
struct Args {
    /// Path to the DGS event stream
    #[arg(long)]
    dgs: PathBuf,

    /// Replay configuration JSON; every field is optional
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only replay the first N event steps
    #[arg(long)]
    max_steps: Option<usize>,

    /// Override the delay before each step (ms)
    #[arg(long)]
    step_delay_ms: Option<u64>,

    /// Override pacing: fixed or proportional
    #[arg(long)]
    pacing: Option<String>,

    /// Wait for enter before starting and before each step
    #[arg(long)]
    interactive: bool,

    /// Skip all pacing delays and operator prompts
    #[arg(long)]
    no_wait: bool,

    /// Daemon config template given to every created node
    #[arg(long)]
    config_template: Option<PathBuf>,

    /// Create the control node (name control, model MONITORING)
    #[arg(long)]
    control_node: bool,

    /// Control network prefix passed as the session option controlnet
    #[arg(long)]
    control_net: Option<String>,

    /// Write the controller call log as a JSON array
    #[arg(long)]
    journal: Option<PathBuf>,
}

fn parse_pacing(raw: Option<&str>, defaults: PacingMode) -> Result<PacingMode> {
    match raw {
        Some("fixed") => Ok(PacingMode::Fixed),
        Some("proportional") => Ok(PacingMode::Proportional),
        Some(other) => Err(Error::Config(format!(
            "unknown pacing '{other}', expected fixed or proportional"
        ))),
        None => Ok(defaults),
    }
}

fn load_config(args: &Args) -> Result<ReplayConfig> {
    let mut cfg = match &args.config {
        Some(path) => ReplayConfig::from_json_path(path)?,
        None => ReplayConfig::default(),
    };
    if args.max_steps.is_some() {
        cfg.max_steps = args.max_steps;
    }
    if let Some(ms) = args.step_delay_ms {
        cfg.step_delay_ms = ms;
    }
    cfg.pacing = parse_pacing(args.pacing.as_deref(), cfg.pacing)?;
    if args.interactive {
        cfg.interactive = true;
    }
    if args.control_node && cfg.control_node.is_none() {
        cfg.control_node = Some(ControlNodeSpec::default());
    }
    if let Some(net) = &args.control_net {
        cfg.control_net = Some(net.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn write_journal(path: &Path, controller: &MemoryController) -> Result<()> {
    let json = serde_json::to_string_pretty(controller.calls())?;
    fs::write(path, json)?;
    info!(path = %path.display(), calls = controller.calls().len(), "已写入控制器调用日志");
    Ok(())
}

fn run(args: Args) -> Result<ReplayReport> {
    let cfg = load_config(&args)?;
    let doc = dgs::read_dgs(&args.dgs)?;

    let template = match &args.config_template {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    let mut controller = MemoryController::new().with_service_file(
        cfg.service.clone(),
        cfg.config_file.clone(),
        template,
    );

    let mut pacer: Box<dyn Pacer> = if args.no_wait {
        Box::new(InstantPacer::default())
    } else {
        Box::new(RealtimePacer)
    };

    let mut engine = ReplayEngine::new(cfg)?;
    let result = engine.run(&doc, &mut controller, pacer.as_mut());

    // 失败时也写出调用日志，便于定位中止位置
    if let Some(path) = &args.journal
        && let Err(e) = write_journal(path, &controller)
    {
        error!(path = %path.display(), error = %e, "写入控制器调用日志失败");
        if result.is_ok() {
            return Err(e);
        }
    }
    result
}

fn main() -> ExitCode {
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
        Ok(report) => {
            println!(
                "done: nodes={} skipped={} links={} steps={} activated={} deactivated={}",
                report.nodes_created,
                report.nodes_skipped,
                report.links_created,
                report.steps_run,
                report.links_activated,
                report.links_deactivated
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "回放失败");
            ExitCode::FAILURE
        }
    }
}
