use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MvfError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Cannot parse progress hint: {0}")]
    ParseError(String),
    #[error("STAR error: {0}")]
    StarError(String),
    #[error("MRC error: {0}")]
    MrcError(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("Merge error: {0}")]
    MergeError(String),
    #[error("Preview error: {0}")]
    PreviewError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Background task failed: {0}")]
    TaskError(String),
    #[error("Row {index} out of range, {len} micrographs loaded")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<std::io::Error> for MvfError {
    fn from(err: std::io::Error) -> Self {
        MvfError::IoError(err.to_string())
    }
}

impl From<image::ImageError> for MvfError {
    fn from(err: image::ImageError) -> Self {
        MvfError::ImageError(err.to_string())
    }
}
