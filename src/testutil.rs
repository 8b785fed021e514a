//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use crate::mrc::{self, Raster};
use crate::preview::PlotCommand;
use crate::star::{self, Block};
use crate::table::{Row, Table};
use crate::watcher::WatcherConfig;

pub const MOTION_JOB: &str = "MotionCorr/job002";
pub const CTF_JOB: &str = "CtfFind/job003";
pub const WATCHER_JOB: &str = "External/job004";
pub const CTF_STAR: &str = "CtfFind/job003/micrographs_ctf.star";

/// Deterministic gaussian-ish noise around `mean`.
pub fn noise_raster(width: u32, height: u32, mean: f32, seed: u64) -> Raster {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels = (0..width as usize * height as usize)
        .map(|_| mean + (0..4).map(|_| rng.gen_range(-1.0f32..1.0)).sum::<f32>())
        .collect();
    Raster {
        width,
        height,
        pixels,
    }
}

pub fn write_mrc(path: &Path, raster: &Raster) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, mrc::encode_f32(raster))
}

/// Stand-in plot program: writes the plotted file name and width to the
/// output so tests can check what it was called with.
pub fn fake_plot_command() -> PlotCommand {
    PlotCommand::with_args(
        "sh",
        vec![
            "-c".into(),
            "printf '%s %s' \"$(basename \"$1\")\" \"$3\" > \"$2\"".into(),
            "sh".into(),
            "{input}".into(),
            "{output}".into(),
            "{width}".into(),
        ],
    )
}

/// Plot program that always fails.
pub fn failing_plot_command() -> PlotCommand {
    PlotCommand::with_args(
        "sh",
        vec!["-c".into(), "echo 'no plot for you' >&2; exit 1".into()],
    )
}

/// A throwaway Relion project with a motion correction job, a CTF job and
/// an External job directory for the watcher.
pub struct RelionProject {
    dir: TempDir,
}

impl RelionProject {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn micrograph_name(index: usize) -> String {
        format!("{MOTION_JOB}/Movies/mic_{index:03}.mrc")
    }

    pub fn ctf_image_name(index: usize) -> String {
        format!("{CTF_JOB}/Movies/mic_{index:03}.ctf")
    }

    /// Writes the micrograph, power spectrum and `_avrot.txt` inputs for
    /// micrographs `0..count`, then both upstream STAR tables.
    pub fn add_micrographs(&self, count: usize) -> std::io::Result<()> {
        for i in 0..count {
            write_mrc(
                &self.path().join(Self::micrograph_name(i)),
                &noise_raster(64, 48, 10.0, i as u64),
            )?;
            write_mrc(
                &self.path().join(Self::ctf_image_name(i)),
                &noise_raster(32, 32, 0.0, 1000 + i as u64),
            )?;
            fs::write(
                self.path()
                    .join(format!("{CTF_JOB}/Movies/mic_{i:03}_avrot.txt")),
                "# 1D rotational average\n0.0 0.1 0.2\n",
            )?;
        }
        self.write_tables(count)
    }

    pub fn write_tables(&self, count: usize) -> std::io::Result<()> {
        let motion: Vec<Row> = (0..count).map(Self::motion_row).collect();
        let ctf: Vec<Row> = (0..count).map(Self::ctf_row).collect();
        write_star(
            &self
                .path()
                .join(MOTION_JOB)
                .join("corrected_micrographs.star"),
            vec![optics_block(), Block::new("micrographs", Table::from_rows(motion))],
        )?;
        write_star(
            &self.path().join(CTF_STAR),
            vec![optics_block(), Block::new("micrographs", Table::from_rows(ctf))],
        )
    }

    pub fn watcher_config(&self, plot: PlotCommand) -> WatcherConfig {
        WatcherConfig {
            project_dir: self.path().to_path_buf(),
            output_dir: PathBuf::from(WATCHER_JOB),
            in_mics: PathBuf::from(CTF_STAR),
            threads: 2,
            mic_width: 32,
            fft_width: 0,
            ctf_width: 0,
            sigma: Some(2.0),
            plot,
        }
    }

    pub fn motion_row(index: usize) -> Row {
        let mut row = Row::new();
        row.insert("rlnMicrographName", Self::micrograph_name(index));
        row.insert(
            "rlnMicrographMetadata",
            format!("{MOTION_JOB}/Movies/mic_{index:03}.star"),
        );
        row.insert("rlnOpticsGroup", "1");
        row.insert("rlnAccumMotionTotal", format!("{:.3}", 10.0 + index as f64));
        row.insert("rlnAccumMotionEarly", format!("{:.3}", 4.0 + index as f64));
        row.insert("rlnAccumMotionLate", format!("{:.3}", 6.0 + index as f64));
        row
    }

    pub fn ctf_row(index: usize) -> Row {
        let mut row = Row::new();
        row.insert("rlnMicrographName", Self::micrograph_name(index));
        row.insert("rlnOpticsGroup", "1");
        row.insert("rlnCtfImage", format!("{}:mrc", Self::ctf_image_name(index)));
        row.insert("rlnDefocusU", format!("{:.6}", 12000.0 + 100.0 * index as f64));
        row.insert("rlnDefocusV", format!("{:.6}", 11800.0 + 100.0 * index as f64));
        row.insert("rlnCtfAstigmatism", "200.000000");
        row.insert("rlnDefocusAngle", "45.000000");
        row.insert("rlnCtfFigureOfMerit", "0.120000");
        row.insert("rlnCtfMaxResolution", format!("{:.6}", 3.5 + index as f64 / 10.0));
        row
    }
}

fn optics_block() -> Block {
    let mut row = Row::new();
    row.insert("rlnOpticsGroupName", "opticsGroup1");
    row.insert("rlnOpticsGroup", "1");
    row.insert("rlnMicrographPixelSize", "0.885000");
    row.insert("rlnVoltage", "300.000000");
    Block::new("optics", Table::from_rows(vec![row]))
}

fn write_star(path: &Path, blocks: Vec<Block>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    star::write(path, &blocks).map_err(|e| std::io::Error::other(e.to_string()))
}
