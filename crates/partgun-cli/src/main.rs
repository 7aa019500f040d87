//! partgun - particle gun production submission.
//!
//! Partitions a production campaign into LSF batch jobs across the
//! GSD, RECO, and NTUP stages and submits them through `bsub`. The
//! partitioning logic lives in `partgun-core`; this binary resolves
//! the run configuration from flags, prints the setup banner, and
//! wires in the real collaborators (or the dry-run submitter).

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use partgun_core::config::{RunConfig, RunRequest, DEFAULT_EOS_AREA};
use partgun_core::discovery::{EosStore, FileStore, LocalStore};
use partgun_core::layout::output_dir_name;
use partgun_core::run::submit_production;
use partgun_core::submit::{BatchSubmitter, DryRunSubmitter, LsfSubmitter};
use partgun_core::toolchain::Toolchain;
use tracing_subscriber::EnvFilter;

/// Submit particle gun production (GSD, RECO, or NTUP) to LSF batch
#[derive(Parser, Debug)]
#[command(name = "partgun")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Tag to be appended to the resulting output dir
    #[arg(short, long, default_value = "")]
    tag: String,

    /// Queue to be used with LSF batch
    #[arg(short, long, default_value = "1nd")]
    queue: String,

    /// Total number of events, applicable to runs with the GSD stage
    #[arg(short = 'n', long, default_value_t = 100)]
    nevts: u64,

    /// Number of events per job; when omitted the recommended value
    /// for the queue and stage is used
    #[arg(short, long)]
    evtsperjob: Option<u64>,

    /// Config template path; when omitted the stage default is used
    #[arg(short = 'c', long)]
    cfg: Option<PathBuf>,

    /// Particle PDG id; when omitted all supported particles run
    #[arg(short, long)]
    part_id: Option<String>,

    /// Number of particles of the chosen type generated per event
    #[arg(long, default_value_t = 10)]
    n_part: u32,

    /// Minimum threshold value
    #[arg(long, default_value_t = 1.0)]
    threshold_min: f64,

    /// Maximum threshold value
    #[arg(long, default_value_t = 35.0)]
    threshold_max: f64,

    /// Pt or E gun
    #[arg(long, default_value = "Pt")]
    gun_type: String,

    /// Store the output dir locally instead of on the EOS area
    #[arg(short, long)]
    local: bool,

    /// Perform a dry run (no jobs are launched)
    #[arg(short = 'y', long)]
    dry_run: bool,

    /// Path to the EOS area where the output jobs will be staged out
    #[arg(long, default_value = DEFAULT_EOS_AREA)]
    eos_area: String,

    /// Data tier to run: GSD, RECO, or NTUP
    #[arg(short = 'd', long, default_value = "GSD")]
    dat_tier: String,

    /// Name of the previous stage dir (relative to the local
    /// submission dir or the EOS area), input for RECO and NTUP
    #[arg(short, long, default_value = "")]
    in_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_request(self) -> RunRequest {
        RunRequest {
            tag: self.tag,
            queue: self.queue,
            total_events: self.nevts,
            events_per_job: self.evtsperjob,
            template: self.cfg,
            particle: self.part_id,
            multiplicity: self.n_part,
            threshold_min: self.threshold_min,
            threshold_max: self.threshold_max,
            gun_type: self.gun_type,
            local: self.local,
            eos_area: self.eos_area,
            stage: self.dat_tier,
            in_dir: self.in_dir,
            ..RunRequest::default()
        }
    }
}

fn print_setup(cfg: &RunConfig, toolchain: &Toolchain, cwd: &Path, out_dir: &str) {
    let inputs = if cfg.stage.upstream().is_some() {
        cfg.in_dir.clone()
    } else {
        let ids = if cfg.particles.len() == 1 {
            cfg.particles[0].to_string()
        } else {
            "all supported".to_string()
        };
        format!(
            "Particle gun type: {gun}, PDG ID {ids}, {n} per event, {gun} threshold in [{min},{max}]",
            gun = cfg.gun.kind,
            n = cfg.gun.multiplicity,
            min = cfg.gun.threshold_min,
            max = cfg.gun.threshold_max,
        )
    };

    println!("--------------------");
    println!("[Run parameters]");
    println!("--------------------");
    println!("DATA TIER:   {}", cfg.stage.long_name());
    println!("CMSSW BASE:  {}", toolchain.base);
    println!("CMSSW VER:   {} [ {} ]", toolchain.version, toolchain.scram_arch);
    println!("CONFIGFILE:  {}", cfg.template.display());
    println!("INPUTS:      {inputs}");
    println!(
        "STORE AREA:  {}",
        if cfg.local {
            cwd.display().to_string()
        } else {
            cfg.eos_area.clone()
        }
    );
    println!("OUTPUT DIR:  {out_dir}");
    println!("QUEUE:       {}", cfg.queue);
    if cfg.stage.upstream().is_none() {
        println!("NUM. EVTS:   {}", cfg.total_events);
    }
    println!("--------------------");
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let dry_run = cli.dry_run;
    let toolchain = Toolchain::discover()?;
    let cfg = RunConfig::resolve(cli.into_request())?;

    let cwd = env::current_dir().context("failed to resolve the working directory")?;
    let date = chrono::Local::now().date_naive();
    let out_dir = if cfg.stage.upstream().is_none() {
        output_dir_name(&cfg.tag, date)
    } else {
        cfg.in_dir.clone()
    };

    print_setup(&cfg, &toolchain, &cwd, &out_dir);
    println!("[Submitting jobs]");

    let store: Box<dyn FileStore> = if cfg.local {
        Box::new(LocalStore)
    } else {
        Box::new(EosStore::default())
    };
    let submitter: Box<dyn BatchSubmitter> = if dry_run {
        Box::new(DryRunSubmitter)
    } else {
        Box::new(LsfSubmitter)
    };

    let summary = submit_production(
        &cfg,
        &toolchain,
        &cwd,
        date,
        store.as_ref(),
        submitter.as_ref(),
    )
    .context("submission run failed")?;

    println!("[Submitted {} jobs]", summary.jobs);
    Ok(())
}
