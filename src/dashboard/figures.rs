use serde::Serialize;

use super::Dataset;

pub const MOTION_COLUMNS: [(&str, &str); 3] = [
    ("rlnAccumMotionEarly", "Whole-frame motion during first 4 e-/Å² (Å)"),
    ("rlnAccumMotionLate", "Whole-frame motion during remainder of movie (Å)"),
    ("rlnAccumMotionTotal", "Total whole-frame motion (Å)"),
];

pub const CTF_COLUMNS: [(&str, &str); 4] = [
    ("rlnDefocusU", "Defocus (Å)"),
    ("rlnCtfAstigmatism", "Astigmatism (Å)"),
    ("rlnCtfFigureOfMerit", "CTF fit figure of merit"),
    ("rlnCtfMaxResolution", "CTF fit resolution (Å)"),
];

const HISTOGRAM_BINS: usize = 20;

/// Per-exposure trace of one column; x is the exposure number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub column: String,
    pub label: String,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub label: String,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Figure {
    pub series: Vec<Series>,
    pub histograms: Vec<Histogram>,
}

/// Data behind the overview, motion and CTF tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FigureSet {
    pub overview: Figure,
    pub motion: Figure,
    pub ctf: Figure,
}

impl FigureSet {
    pub fn from_dataset(data: &Dataset) -> Self {
        let all: Vec<(&str, &str)> = MOTION_COLUMNS.iter().chain(CTF_COLUMNS.iter()).copied().collect();
        Self {
            overview: Figure {
                series: series(data, &all),
                histograms: Vec::new(),
            },
            motion: Figure {
                series: series(data, &MOTION_COLUMNS),
                histograms: histograms(data, &MOTION_COLUMNS),
            },
            ctf: Figure {
                series: series(data, &CTF_COLUMNS),
                histograms: histograms(data, &CTF_COLUMNS),
            },
        }
    }
}

pub fn counter_text(count: usize) -> String {
    format!("Total processed micrographs: {count}")
}

fn series(data: &Dataset, columns: &[(&str, &str)]) -> Vec<Series> {
    columns
        .iter()
        .map(|(column, label)| Series {
            column: column.to_string(),
            label: label.to_string(),
            y: data.numbers(column).unwrap_or_default(),
        })
        .collect()
}

fn histograms(data: &Dataset, columns: &[(&str, &str)]) -> Vec<Histogram> {
    columns
        .iter()
        .map(|(column, label)| {
            let values: Vec<f64> = data
                .numbers(column)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .filter(|v| v.is_finite())
                .collect();
            Histogram {
                column: column.to_string(),
                label: label.to_string(),
                bins: bin(&values, HISTOGRAM_BINS),
            }
        })
        .collect()
}

/// Equal-width bins over `[min, max]`; the last bin is closed.
pub fn bin(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        return vec![Bin {
            start: lo,
            end: hi,
            count: values.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    #[test]
    fn test_bin_counts_every_value() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bins = bin(&values, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert!(bins.iter().all(|b| b.count == 10));
    }

    #[test]
    fn test_bin_constant_values() {
        let bins = bin(&[2.0, 2.0, 2.0], 5);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
        assert!(bin(&[], 5).is_empty());
    }

    #[test]
    fn test_figure_set_layout() {
        let table = Table::from_rows(vec![
            [("rlnDefocusU", "10000"), ("rlnAccumMotionTotal", "12.5")]
                .into_iter()
                .collect(),
        ]);
        let figures = FigureSet::from_dataset(&Dataset::from_table(&table));

        assert_eq!(figures.overview.series.len(), 7);
        assert!(figures.overview.histograms.is_empty());
        assert_eq!(figures.motion.series.len(), 3);
        assert_eq!(figures.motion.histograms.len(), 3);
        assert_eq!(figures.ctf.series.len(), 4);
        assert_eq!(figures.ctf.series[0].y, vec![Some(10000.0)]);
        // columns absent from the table give empty traces
        assert!(figures.ctf.series[1].y.is_empty());
    }

    #[test]
    fn test_counter_text() {
        assert_eq!(counter_text(3), "Total processed micrographs: 3");
    }
}
