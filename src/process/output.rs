//! Child stdout/stderr passthrough into the host log.
//!
//! Python inference servers are chatty: model loaders print progress bars and
//! framework warnings that say nothing about service health.  Each line is
//! classified so known-benign noise drops to `debug` while tracebacks stand
//! out at `warn`.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Substrings of warnings that are expected on every start and never actionable.
const BENIGN_SUBSTRINGS: &[&str] = &[
    "FP16 is not supported on CPU",
    "UserWarning",
    "FutureWarning",
    "DeprecationWarning",
    "warnings.warn(",
];

/// Substrings that indicate the child is reporting a real problem.
const ERROR_SUBSTRINGS: &[&str] = &["Traceback", "Error", "ERROR", "Exception"];

/// Log level a child output line is forwarded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    /// Known-benign noise.
    Debug,
    /// Ordinary progress output.
    Info,
    /// Something that looks like an error report.
    Warn,
}

impl From<LineLevel> for log::Level {
    fn from(level: LineLevel) -> Self {
        match level {
            LineLevel::Debug => log::Level::Debug,
            LineLevel::Info => log::Level::Info,
            LineLevel::Warn => log::Level::Warn,
        }
    }
}

/// Decide how loudly to forward one line of child output.
///
/// Benign matches win over error matches: `"UserWarning: ... Error ..."` is
/// still noise.
pub fn classify_line(line: &str) -> LineLevel {
    if BENIGN_SUBSTRINGS.iter().any(|s| line.contains(s)) {
        LineLevel::Debug
    } else if ERROR_SUBSTRINGS.iter().any(|s| line.contains(s)) {
        LineLevel::Warn
    } else {
        LineLevel::Info
    }
}

/// Read `reader` line by line until EOF, forwarding each non-blank line to
/// the log under target `child::<label>`.
pub(crate) async fn forward_output<R>(reader: R, label: String)
where
    R: AsyncRead + Unpin,
{
    let target = format!("child::{label}");
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                let level: log::Level = classify_line(line).into();
                log::log!(target: target.as_str(), level, "{line}");
            }
            Ok(None) => break,
            Err(e) => {
                log::debug!("process[{label}]: output stream closed: {e}");
                break;
            }
        }
    }
}
