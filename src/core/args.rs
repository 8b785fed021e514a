use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use log::kv::{ToValue, Value};

/// Serve the MVF progress dashboard for a Relion project.
#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct DashboardArgs {
    /// The Relion/MVF project directory to be served
    pub project_dir: Option<PathBuf>,
    /// Frequency in seconds to direct clients to poll the server
    #[arg(long)]
    pub cfreq: Option<u64>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ToValue for DashboardArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}

/// Consolidate MotionCor and CTFFind job results into a single STAR file.
///
/// Relion calls this as `$0 --o External/jobXXX/ --in_mics ZZZ --LABELN VALUEN --j J`;
/// use [`WatcherArgs::parse_relion`] so the job parameter pairs are skipped.
#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct WatcherArgs {
    #[arg(long = "o")]
    pub output_dir: PathBuf,
    #[arg(long = "in_mics")]
    pub in_mics: PathBuf,
    #[arg(long = "j", default_value_t = 1)]
    pub threads: usize,
    #[arg(long = "mic_width", default_value_t = 0)]
    pub mic_width: u32,
    #[arg(long = "fft_width", default_value_t = 0)]
    pub fft_width: u32,
    #[arg(long = "ctf_width", default_value_t = 0)]
    pub ctf_width: u32,
    /// Contrast stretch in standard deviations, 0 disables it
    #[arg(long = "sigma", default_value_t = 2.0, allow_negative_numbers = true)]
    pub sigma: f32,
    #[arg(long = "project_dir", default_value = ".")]
    pub project_dir: PathBuf,
    #[arg(long = "plot_program", default_value = "mvf-ctf-plot")]
    pub plot_program: String,
}

impl WatcherArgs {
    /// Parses a Relion External job command line. `--LABEL VALUE` pairs this
    /// program does not declare are dropped wherever they appear.
    pub fn parse_relion<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::parse_from(Self::declared_only(argv))
    }

    fn declared_only<I, T>(argv: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let command = Self::command();
        let valued: Vec<String> = command
            .get_arguments()
            .filter_map(|arg| arg.get_long())
            .map(|long| format!("--{long}"))
            .collect();
        let switches = ["--help", "-h", "--version", "-V"];

        let mut argv = argv.into_iter().map(Into::into).peekable();
        let mut kept: Vec<String> = argv.next().into_iter().collect();
        while let Some(arg) = argv.next() {
            let (flag, inline_value) = match arg.split_once('=') {
                Some((flag, _)) => (flag.to_string(), true),
                None => (arg.clone(), false),
            };
            let takes_value = !inline_value
                && argv.peek().is_some_and(|next| !next.starts_with("--"));

            if switches.contains(&flag.as_str()) {
                kept.push(arg);
            } else if valued.contains(&flag) {
                kept.push(arg);
                if takes_value {
                    kept.extend(argv.next());
                }
            } else if arg.starts_with("--") {
                if takes_value {
                    argv.next();
                }
            } else {
                // stray positional: leave it for clap to report
                kept.push(arg);
            }
        }
        kept
    }
}

impl ToValue for WatcherArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
