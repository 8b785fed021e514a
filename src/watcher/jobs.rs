use std::path::{Path, PathBuf};

use log::warn;

use crate::preview::{Conversion, MrcPngOptions, PlotOptions, PreviewJob};
use crate::table::Row;

use super::WatcherConfig;

const MICROGRAPH_FIELD: &str = "rlnMicrographName";
const CTF_IMAGE_FIELD: &str = "rlnCtfImage";

/// Micrograph, power spectrum and CTF fit plot previews for one merged row.
/// Fields missing from the row are skipped with a warning.
pub fn plan(row: &Row, config: &WatcherConfig, previews: &Path) -> Vec<PreviewJob> {
    let mut jobs = Vec::with_capacity(3);

    match text_field(row, MICROGRAPH_FIELD) {
        Some(micrograph) => {
            let input = config.project_dir.join(micrograph);
            jobs.push(PreviewJob {
                conversion: Conversion::MrcToPng(MrcPngOptions {
                    sigma_contrast: config.sigma,
                    target_width: config.mic_width,
                }),
                output: previews.join(format!("{}.png", stem(&input))),
                input,
            });
        }
        None => warn!("row has no {MICROGRAPH_FIELD}, skipping micrograph preview"),
    }

    match text_field(row, CTF_IMAGE_FIELD) {
        Some(ctf_image) => {
            // "CtfFind/job003/Movies/a.ctf:mrc"
            let ctf_image = ctf_image.strip_suffix(":mrc").unwrap_or(ctf_image);
            let input = config.project_dir.join(ctf_image);
            let stem = stem(&input);
            let avrot = input.with_file_name(format!("{stem}_avrot.txt"));
            jobs.push(PreviewJob {
                conversion: Conversion::MrcToPng(MrcPngOptions {
                    sigma_contrast: config.sigma,
                    target_width: config.fft_width,
                }),
                output: previews.join(format!("{stem}_fft.png")),
                input,
            });
            jobs.push(PreviewJob {
                conversion: Conversion::CtfPlotToPng(PlotOptions {
                    command: config.plot.clone(),
                    target_width: config.ctf_width,
                }),
                output: previews.join(format!("{stem}_avrot.png")),
                input: avrot,
            });
        }
        None => warn!("row has no {CTF_IMAGE_FIELD}, skipping CTF previews"),
    }

    jobs
}

/// `MotionCorr/job002/Movies/a.mrc` -> `MotionCorr/job002`.
pub fn job_dir(micrograph: &str) -> Option<PathBuf> {
    let mut components = Path::new(micrograph).components();
    let first = components.next()?;
    let second = components.next()?;
    components.next()?;
    Some(PathBuf::from(first.as_os_str()).join(second.as_os_str()))
}

fn text_field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name)?.as_text().filter(|s| !s.is_empty())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
