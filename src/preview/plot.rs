use std::path::Path;
use std::process::Command;

use log::debug;

use crate::core::MvfError;

use super::PlotOptions;

pub const DEFAULT_PLOT_PROGRAM: &str = "mvf-ctf-plot";

/// External program that renders a CTFFIND `_avrot.txt` file as a PNG.
///
/// Argument templates may contain `{input}`, `{output}` and `{width}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlotCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["{input}".into(), "{output}".into(), "{width}".into()],
        }
    }

    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand(&self, input: &Path, output: &Path, width: u32) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let width = width.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{width}", &width)
            })
            .collect()
    }
}

impl Default for PlotCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PLOT_PROGRAM)
    }
}

/// Delegates plotting to the configured program; a width of 0 leaves the
/// size to the program.
pub fn ctf_plot_to_png(input: &Path, output: &Path, options: &PlotOptions) -> Result<(), MvfError> {
    if !input.is_file() {
        return Err(MvfError::NotFound(format!("{}", input.display())));
    }
    let args = options.command.expand(input, output, options.target_width);
    debug!("running {} {:?}", options.command.program, args);

    let result = Command::new(&options.command.program)
        .args(&args)
        .output()
        .map_err(|e| {
            MvfError::PreviewError(format!("running {}: {}", options.command.program, e))
        })?;

    if !result.status.success() {
        return Err(MvfError::PreviewError(format!(
            "{} exited with {}: {}",
            options.command.program,
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }
    if !output.is_file() {
        return Err(MvfError::PreviewError(format!(
            "{} did not produce {}",
            options.command.program,
            output.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> PlotCommand {
        PlotCommand::with_args(
            "sh",
            vec![
                "-c".into(),
                script.into(),
                "sh".into(),
                "{input}".into(),
                "{output}".into(),
                "{width}".into(),
            ],
        )
    }

    fn setup() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a_avrot.txt");
        std::fs::write(&input, "# avrot\n").unwrap();
        (dir, input)
    }

    #[test]
    fn test_expand_placeholders() {
        let cmd = PlotCommand::default();
        let args = cmd.expand(Path::new("in.txt"), Path::new("out.png"), 300);
        assert_eq!(args, vec!["in.txt", "out.png", "300"]);
    }

    #[test]
    fn test_successful_plot() {
        let (dir, input) = setup();
        let output = dir.path().join("a_avrot.png");
        let options = PlotOptions {
            command: sh("printf \"$3\" > \"$2\""),
            target_width: 640,
        };
        ctf_plot_to_png(&input, &output, &options).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "640");
    }

    #[test]
    fn test_failing_program() {
        let (dir, input) = setup();
        let options = PlotOptions {
            command: sh("echo broken >&2; exit 3"),
            target_width: 0,
        };
        let err = ctf_plot_to_png(&input, &dir.path().join("x.png"), &options).unwrap_err();
        assert!(matches!(err, MvfError::PreviewError(msg) if msg.contains("broken")));
    }

    #[test]
    fn test_program_without_output() {
        let (dir, input) = setup();
        let options = PlotOptions {
            command: sh("true"),
            target_width: 0,
        };
        let err = ctf_plot_to_png(&input, &dir.path().join("x.png"), &options).unwrap_err();
        assert!(matches!(err, MvfError::PreviewError(msg) if msg.contains("did not produce")));
    }

    #[test]
    fn test_missing_program() {
        let (dir, input) = setup();
        let options = PlotOptions {
            command: PlotCommand::new("mvf-no-such-program"),
            target_width: 0,
        };
        assert!(ctf_plot_to_png(&input, &dir.path().join("x.png"), &options).is_err());
    }
}
