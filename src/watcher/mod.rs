//! One watcher run as launched by Relion's External job type: merge the CTF
//! and motion correction tables, render previews for the rows that are new
//! since the previous run, then publish the merged table and its hint.

mod jobs;

pub use jobs::{job_dir, plan};

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::core::{MvfError, WatcherArgs};
use crate::preview::{PREVIEWS_DIR, PlotCommand, PreviewQueue};
use crate::progress::{HINT_FILE_NAME, MICROGRAPHS_BLOCK, write_hint};
use crate::star::{self, Block};
use crate::table::{Row, Table, merge};

pub const OPTICS_BLOCK: &str = "optics";
pub const OUTPUT_STAR: &str = "micrographs.star";
pub const MOTION_STAR: &str = "corrected_micrographs.star";
pub const NODES_STAR: &str = "RELION_OUTPUT_NODES.star";
pub const SUCCESS_SENTINEL: &str = "RELION_JOB_EXIT_SUCCESS";
pub const FAILURE_SENTINEL: &str = "RELION_JOB_EXIT_FAILURE";
pub const MERGE_KEY: &str = "rlnMicrographName";

/// Relion node type for a micrographs STAR file.
const MICROGRAPHS_NODE_TYPE: &str = "1";

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Relion project directory; every other path is relative to it.
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub in_mics: PathBuf,
    pub threads: usize,
    pub mic_width: u32,
    pub fft_width: u32,
    pub ctf_width: u32,
    pub sigma: Option<f32>,
    pub plot: PlotCommand,
}

impl WatcherConfig {
    pub fn output_path(&self) -> PathBuf {
        self.project_dir.join(&self.output_dir)
    }

    pub fn previews_path(&self) -> PathBuf {
        self.output_path().join(PREVIEWS_DIR)
    }
}

impl From<&WatcherArgs> for WatcherConfig {
    fn from(args: &WatcherArgs) -> Self {
        Self {
            project_dir: args.project_dir.clone(),
            output_dir: args.output_dir.clone(),
            in_mics: args.in_mics.clone(),
            threads: args.threads.max(1),
            mic_width: args.mic_width,
            fft_width: args.fft_width,
            ctf_width: args.ctf_width,
            sigma: (args.sigma > 0.0).then_some(args.sigma),
            plot: PlotCommand::new(&args.plot_program),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchReport {
    /// Rows in the merged table after this run.
    pub total: usize,
    /// Rows appended by this run.
    pub appended: usize,
    pub jobs: usize,
    pub failed_jobs: usize,
}

/// Runs one incremental pass. Preview failures are logged and counted but
/// do not fail the run; table and hint I/O errors do.
pub fn run(config: &WatcherConfig) -> Result<WatchReport, MvfError> {
    let output = config.output_path();
    fs::create_dir_all(&output)?;

    let ctf_path = config.project_dir.join(&config.in_mics);
    let mut ctf_star = star::read(&ctf_path, None)?;
    let optics = ctf_star.take(OPTICS_BLOCK);
    let ctf_rows = ctf_star
        .take(MICROGRAPHS_BLOCK)
        .map(|block| block.table.into_rows())
        .unwrap_or_default();

    let motion_rows = match ctf_rows.first() {
        Some(first) => read_motion_rows(config, first)?,
        None => Vec::new(),
    };

    let output_star = output.join(OUTPUT_STAR);
    let previous = read_previous(&output_star)?;
    info!(
        "merging {} ctf rows with {} motion rows onto {} existing",
        ctf_rows.len(),
        motion_rows.len(),
        previous.len()
    );
    let outcome = merge(previous, &ctf_rows, &motion_rows, Some(MERGE_KEY))?;

    let new_rows = &outcome.table.rows()[outcome.table.len() - outcome.appended..];
    let (jobs, failed_jobs) = render_previews(config, new_rows)?;

    let mut blocks = Vec::with_capacity(2);
    blocks.extend(optics);
    blocks.push(Block::new(MICROGRAPHS_BLOCK, outcome.table));
    star::write(&output_star, &blocks)?;

    let table_path = config.output_dir.join(OUTPUT_STAR);
    write_output_nodes(&output.join(NODES_STAR), &table_path)?;

    let total = blocks.last().map_or(0, |block| block.table.len());
    write_hint(&config.project_dir.join(HINT_FILE_NAME), &table_path, total)?;

    let report = WatchReport {
        total,
        appended: outcome.appended,
        jobs,
        failed_jobs,
    };
    info!(
        "watcher pass done: {} micrographs ({} new), {}/{} previews failed",
        report.total, report.appended, report.failed_jobs, report.jobs
    );
    Ok(report)
}

/// Writes the exit sentinel Relion's scheduler polls for and removes the
/// opposite one left by an earlier run.
pub fn record_exit(output_dir: &Path, succeeded: bool) -> Result<(), MvfError> {
    let (create, clear) = if succeeded {
        (SUCCESS_SENTINEL, FAILURE_SENTINEL)
    } else {
        (FAILURE_SENTINEL, SUCCESS_SENTINEL)
    };
    fs::create_dir_all(output_dir)?;
    match fs::remove_file(output_dir.join(clear)) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }
    fs::File::create(output_dir.join(create))?;
    Ok(())
}

/// The motion table lives in the job directory of the first micrograph.
fn read_motion_rows(config: &WatcherConfig, first: &Row) -> Result<Vec<Row>, MvfError> {
    let micrograph = first
        .get(MERGE_KEY)
        .and_then(|value| value.as_text())
        .ok_or_else(|| MvfError::StarError(format!("ctf table has no {MERGE_KEY}")))?;
    let job = job_dir(micrograph).ok_or_else(|| {
        MvfError::StarError(format!("cannot derive motion job from '{micrograph}'"))
    })?;
    let path = config.project_dir.join(job).join(MOTION_STAR);
    let mut motion = star::read(&path, Some(&[MICROGRAPHS_BLOCK]))?;
    Ok(motion
        .take(MICROGRAPHS_BLOCK)
        .map(|block| block.table.into_rows())
        .unwrap_or_default())
}

fn read_previous(path: &Path) -> Result<Table, MvfError> {
    if !path.is_file() {
        return Ok(Table::new());
    }
    let mut previous = star::read(path, Some(&[MICROGRAPHS_BLOCK]))?;
    Ok(previous
        .take(MICROGRAPHS_BLOCK)
        .map(|block| block.table)
        .unwrap_or_default())
}

fn render_previews(config: &WatcherConfig, rows: &[Row]) -> Result<(usize, usize), MvfError> {
    let previews = config.previews_path();
    fs::create_dir_all(&previews)?;

    let queue = PreviewQueue::new();
    for row in rows {
        for job in plan(row, config, &previews) {
            queue.push(job);
        }
    }
    let queued = queue.len();
    if queued == 0 {
        return Ok((0, 0));
    }

    let outcomes = queue.drain(config.threads);
    let mut failed = 0;
    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        failed += 1;
        if let Err(e) = &outcome.result {
            warn!("preview {} failed: {e}", outcome.job.output.display());
        }
    }
    Ok((queued, failed))
}

fn write_output_nodes(path: &Path, table_path: &Path) -> Result<(), MvfError> {
    let node: Row = [
        (
            "rlnPipeLineNodeName",
            table_path.to_string_lossy().into_owned(),
        ),
        ("rlnPipeLineNodeType", MICROGRAPHS_NODE_TYPE.to_string()),
    ]
    .into_iter()
    .collect();
    star::write(
        path,
        &[Block::new("output_nodes", Table::from_rows(vec![node]))],
    )
}
