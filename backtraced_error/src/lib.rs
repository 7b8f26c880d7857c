use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};

pub fn error_chain_to_pretty_formatted<E>(error: E) -> String
where
    E: std::error::Error,
{
    let mut err = format!("{}", error);
    let mut source = error.source();
    while let Some(inner_err) = source {
        err.push_str(&format!("\nCaused by: \n{}", inner_err));
        source = inner_err.source();
    }
    err
}

#[derive(Debug, thiserror::Error)]
#[error("SqlxError Context: {context}\n{backtrace}")]
pub struct SqlxError {
    #[source]
    pub source: sqlx::Error,
    pub context: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

#[derive(Debug, thiserror::Error)]
#[error("SerdeJsonError Context: {context}\n{bad_input_sample}\n{backtrace}")]
pub struct SerdeJsonError {
    #[source]
    pub source: serde_json::Error,
    pub context: String,
    pub bad_input_sample: String,
    pub backtrace: OptionBacktracePrettyPrinter,
}

const BAD_INPUT_SAMPLE_CHARS: usize = 256;

impl SerdeJsonError {
    pub fn from_serde_json_error<S: Into<String>>(
        source: serde_json::Error,
        context: S,
        bad_input_sample: String,
    ) -> Self {
        Self {
            source,
            context: context.into(),
            bad_input_sample: bad_input_sample.chars().take(BAD_INPUT_SAMPLE_CHARS).collect(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("IoError Context: {context} ({})\n{backtrace}", .path.display())]
pub struct IoError {
    #[source]
    pub source: std::io::Error,
    pub context: String,
    pub path: PathBuf,
    pub backtrace: OptionBacktracePrettyPrinter,
}

impl IoError {
    pub fn from_io_error<S: Into<String>>(source: std::io::Error, context: S, path: &Path) -> Self {
        Self {
            source,
            context: context.into(),
            path: path.to_path_buf(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[derive(Debug)]
pub struct OptionBacktracePrettyPrinter(pub Option<Backtrace>);

impl OptionBacktracePrettyPrinter {
    pub fn capture() -> Self {
        Self::from(Backtrace::capture())
    }
}

impl From<Backtrace> for OptionBacktracePrettyPrinter {
    fn from(value: Backtrace) -> Self {
        Self(Some(value))
    }
}
impl std::fmt::Display for OptionBacktracePrettyPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            Some(child) => write!(f, "{}", child),
            None => write!(f, "No backtrace"),
        }
    }
}

impl SqlxError {
    pub fn from_sqlx_error<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self {
            source,
            context: context.into(),
            backtrace: OptionBacktracePrettyPrinter::capture(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_chain_includes_every_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = IoError {
            source: io,
            context: "reading trace file".to_string(),
            path: PathBuf::from("data/a.json"),
            backtrace: OptionBacktracePrettyPrinter(None),
        };
        let formatted = error_chain_to_pretty_formatted(&err);
        assert!(formatted.starts_with("IoError Context: reading trace file (data/a.json)"));
        assert!(formatted.contains("No backtrace"));
        assert!(formatted.ends_with("Caused by: \nno such file"));
    }

    #[test]
    fn constructors_capture_a_backtrace() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = IoError::from_io_error(io, "writing query output", Path::new("out/a.json"));
        assert!(err.backtrace.0.is_some());
        let err = SqlxError::from_sqlx_error(sqlx::Error::PoolTimedOut, "scanning");
        assert!(err.backtrace.0.is_some());
    }

    #[test]
    fn serde_json_error_sample_is_truncated() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SerdeJsonError::from_serde_json_error(source, "parsing", "x".repeat(10_000));
        assert_eq!(err.bad_input_sample.len(), BAD_INPUT_SAMPLE_CHARS);
    }
}
