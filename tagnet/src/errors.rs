//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = TagnetError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum TagnetError {
    InvalidArgument(InvalidArgumentError),
    DegenerateInput(DegenerateInputError),
    NotConverged(NotConvergedError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    IOError(std::io::Error),
}

impl TagnetError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn degenerate_input<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::DegenerateInput(DegenerateInputError { msg: msg.into() })
    }

    pub(crate) const fn not_converged(iterations: usize, delta: f64) -> Self {
        Self::NotConverged(NotConvergedError { iterations, delta })
    }
}

impl fmt::Display for TagnetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::DegenerateInput(e) => e.fmt(f),
            Self::NotConverged(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for TagnetError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when training or prediction data leaves a quantity undefined, such as an empty
/// vocabulary or a zero responsibility denominator.
#[derive(Debug)]
pub struct DegenerateInputError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for DegenerateInputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DegenerateInputError: {}", self.msg)
    }
}

impl Error for DegenerateInputError {}

/// Error used when an iterative estimation hits its iteration bound.
#[derive(Debug)]
pub struct NotConvergedError {
    /// Number of completed iterations.
    pub(crate) iterations: usize,

    /// Convergence delta of the last iteration.
    pub(crate) delta: f64,
}

impl fmt::Display for NotConvergedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "NotConvergedError: no convergence after {} iterations (delta: {})",
            self.iterations, self.delta
        )
    }
}

impl Error for NotConvergedError {}

impl From<bincode::error::DecodeError> for TagnetError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for TagnetError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<std::io::Error> for TagnetError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
