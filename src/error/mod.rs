//! Error handling for the ammeter tester

use colored::{Color, Colorize};
use thiserror::Error;

/// Every failure the tester can surface
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad configuration, including unknown device types
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect, write or read against a device failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A device call exceeded its request timeout
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Nothing left to analyze
    #[error("Analysis input error: {0}")]
    AnalysisInput(String),

    /// A device cannot be ranked with the data supplied
    #[error("Ranking input error: {0}")]
    RankingInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A run stopped before it produced its full sample budget
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// A distribution could not be built or evaluated
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Archive and config file access
    #[error("I/O error: {0}")]
    Io(String),

    /// Unparsable readings, numbers or JSON
    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How a class of errors is tagged, colored, hinted at and turned into an exit status
struct ErrorClass {
    tag: &'static str,
    exit_code: i32,
    color: Color,
    hint: &'static str,
}

const CONFIG: ErrorClass = ErrorClass {
    tag: "CONFIG",
    exit_code: 1,
    color: Color::Red,
    hint: "Check the ammeters section of your configuration file or the --device argument.",
};
const TRANSPORT: ErrorClass = ErrorClass {
    tag: "TRANSPORT",
    exit_code: 2,
    color: Color::Yellow,
    hint: "Make sure the ammeter (or its emulator) is listening on the configured host and port.",
};
const TIMEOUT: ErrorClass = ErrorClass {
    tag: "TIMEOUT",
    exit_code: 3,
    color: Color::Yellow,
    hint: "Raise testing.sampling.request_timeout_ms or check the device connection.",
};
const ANALYSIS: ErrorClass = ErrorClass {
    tag: "ANALYSIS",
    exit_code: 6,
    color: Color::Cyan,
    hint: "Every sample of the run failed. Check the device before re-running.",
};
const RANKING: ErrorClass = ErrorClass {
    tag: "RANKING",
    exit_code: 6,
    color: Color::Cyan,
    hint: "Every ranked device needs a completed run with std_dev in analysis.statistical_metrics.",
};
const VALIDATION: ErrorClass = ErrorClass {
    tag: "VALIDATION",
    exit_code: 1,
    color: Color::Red,
    hint: "Check sampling frequency, sample count and metric names.",
};
const CANCELLED: ErrorClass = ErrorClass {
    tag: "CANCELLED",
    // SIGINT convention
    exit_code: 130,
    color: Color::Blue,
    hint: "Re-run the test to collect a full sample set.",
};
const STATS: ErrorClass = ErrorClass {
    tag: "STATS",
    exit_code: 6,
    color: Color::Cyan,
    hint: "The readings may be too few or degenerate for this statistic.",
};
const IO: ErrorClass = ErrorClass {
    tag: "IO",
    exit_code: 5,
    color: Color::Cyan,
    hint: "Check permissions and free space for the results directory.",
};
const PARSE: ErrorClass = ErrorClass {
    tag: "PARSE",
    exit_code: 1,
    color: Color::Red,
    hint: "Check the format of your configuration file.",
};
const INTERNAL: ErrorClass = ErrorClass {
    tag: "INTERNAL",
    exit_code: 99,
    color: Color::BrightRed,
    hint: "This is a bug; please report it with the message above.",
};

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn analysis_input(message: impl Into<String>) -> Self {
        Self::AnalysisInput(message.into())
    }

    pub fn ranking_input(message: impl Into<String>) -> Self {
        Self::RankingInput(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    pub fn statistics(message: impl Into<String>) -> Self {
        Self::Statistics(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    fn class(&self) -> &'static ErrorClass {
        match self {
            Self::Config(_) => &CONFIG,
            Self::Transport(_) => &TRANSPORT,
            Self::Timeout(_) => &TIMEOUT,
            Self::AnalysisInput(_) => &ANALYSIS,
            Self::RankingInput(_) => &RANKING,
            Self::Validation(_) => &VALIDATION,
            Self::Cancelled(_) => &CANCELLED,
            Self::Statistics(_) => &STATS,
            Self::Io(_) => &IO,
            Self::Parse(_) => &PARSE,
            Self::Internal(_) => &INTERNAL,
        }
    }

    /// Short tag used in logs and console output
    pub fn category(&self) -> &'static str {
        self.class().tag
    }

    /// Process exit status when this error ends the program
    pub fn exit_code(&self) -> i32 {
        self.class().exit_code
    }

    /// Per-sample errors the sampler absorbs into a failed sample
    pub fn is_sample_level(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_) | Self::Parse(_))
    }

    /// What the user can do about it
    pub fn hint(&self) -> &'static str {
        self.class().hint
    }

    /// `[TAG] message`, colored by class when requested
    pub fn format_for_console(&self, use_color: bool) -> String {
        let class = self.class();
        let message = self.to_string();
        if use_color {
            format!("[{}] {}", class.tag.color(class.color).bold(), message.color(class.color))
        } else {
            format!("[{}] {}", class.tag, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<statrs::StatsError> for AppError {
    fn from(error: statrs::StatsError) -> Self {
        Self::statistics(format!("Distribution error: {}", error))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal(format!("Sampler task failed: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Prints fatal errors for the CLI
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.format_error(error));
    }

    /// The line `report_error` prints; verbose mode appends the hint
    pub fn format_error(&self, error: &AppError) -> String {
        let line = error.format_for_console(self.use_color);
        if self.verbose {
            format!("{}\n  hint: {}", line, error.hint())
        } else {
            line
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
