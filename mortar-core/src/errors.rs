use std::fmt;

use mortar_dsl::diagnostics::Location;
use mortar_kernel::build::BuildError;
use mortar_kernel::options::OptionError;
use mortar_kernel::ports::PortError;

/// Classification of evaluation failures as the DSL author sees them.
/// Control flow (break/continue/subdir-done) is not represented here; it
/// travels through [`crate::interpreter::Flow`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong arity, wrong type, unknown kwarg, bad kwarg value.
    InvalidArguments,
    /// Ill-formed construct: second `project()`, sandbox violation, ...
    InvalidCode,
    /// Runtime failure reported by a built-in.
    Interpreter,
    /// Dependency-resolution failure; trapped when `required: false`.
    Dependency,
    /// Subproject-resolver failure; trapped when `required: false`.
    Wrap,
}

impl ErrorKind {
    fn label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArguments => "Invalid arguments",
            ErrorKind::InvalidCode => "Invalid code",
            ErrorKind::Interpreter => "Error",
            ErrorKind::Dependency => "Dependency error",
            ErrorKind::Wrap => "Subproject error",
        }
    }
}

/// An evaluation error with the source position it was raised at and the
/// `in subproject X, subdir Y` frames accumulated while unwinding.
#[derive(Clone, Debug)]
pub struct IntpError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
    pub frames: Vec<String>,
}

impl IntpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            frames: Vec::new(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments, message)
    }

    pub fn invalid_code(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCode, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Interpreter, message)
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dependency, message)
    }

    pub fn wrap(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Wrap, message)
    }

    pub fn at(mut self, location: &Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }

    pub fn push_frame(&mut self, frame: String) {
        self.frames.push(frame);
    }

    /// Whether a `required: false` boundary may soften this error into a
    /// disabled/not-found record. Ill-formed code always propagates; any
    /// other failure raised inside the boundary is trapped.
    pub fn is_trappable(&self) -> bool {
        self.kind != ErrorKind::InvalidCode
    }
}

impl fmt::Display for IntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}: {}", self.kind.label(), self.message)?,
            None => write!(f, "{}: {}", self.kind.label(), self.message)?,
        }
        for frame in &self.frames {
            write!(f, "\n  {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for IntpError {}

impl From<BuildError> for IntpError {
    fn from(err: BuildError) -> Self {
        IntpError::invalid_code(err.0)
    }
}

impl From<OptionError> for IntpError {
    fn from(err: OptionError) -> Self {
        IntpError::invalid_arguments(err.0)
    }
}

impl From<PortError> for IntpError {
    fn from(err: PortError) -> Self {
        IntpError::runtime(err.to_string())
    }
}

pub type IntpResult<T> = Result<T, IntpError>;
