//! Preview generation: PNG renderings of micrographs, power spectra and
//! CTF fit plots, produced by a small pool of worker threads.

mod plot;
mod queue;
mod raster;

pub use plot::{DEFAULT_PLOT_PROGRAM, PlotCommand, ctf_plot_to_png};
pub use queue::PreviewQueue;
pub use raster::{contrast_stretch, mrc_to_png, resize_to_width, scaled_height};

use std::path::PathBuf;

use crate::core::MvfError;

/// Fixed subdirectory next to the merged table holding the previews.
pub const PREVIEWS_DIR: &str = "Previews";

#[derive(Debug, Clone, PartialEq)]
pub struct MrcPngOptions {
    /// Clip to `mean ± k·σ` before scaling; `None` scales min..max.
    pub sigma_contrast: Option<f32>,
    /// Output width in pixels, 0 keeps the source size.
    pub target_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    pub command: PlotCommand,
    pub target_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    MrcToPng(MrcPngOptions),
    CtfPlotToPng(PlotOptions),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewJob {
    pub conversion: Conversion,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl PreviewJob {
    pub fn run(&self) -> Result<(), MvfError> {
        match &self.conversion {
            Conversion::MrcToPng(options) => mrc_to_png(&self.input, &self.output, options),
            Conversion::CtfPlotToPng(options) => {
                ctf_plot_to_png(&self.input, &self.output, options)
            }
        }
    }
}

/// What happened to one job. Failed jobs are not retried.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: PreviewJob,
    pub result: Result<(), MvfError>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
