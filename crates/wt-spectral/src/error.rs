//! Error taxonomy for spectral factorization.
//!
//! Every failure propagates straight to the caller of `factorize`. Nothing is
//! retried and no bin is ever patched with a default value, since a corrupted
//! factor contaminates every later pass multiplicatively.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum WilsonError {
    // === Input Errors ===
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // === Numerical Errors ===
    #[error("Matrix is not positive definite{}: {message}", fmt_bin(.bin))]
    NotPositiveDefinite { message: String, bin: Option<usize> },

    #[error("Matrix is numerically singular{} (condition number {condition:.3e})", fmt_bin(.bin))]
    SingularMatrix { bin: Option<usize>, condition: f64 },

    // === Internal Errors ===
    #[error("Dimension mismatch: {lhs:?} vs {rhs:?} (this is a bug, please report)")]
    DimensionMismatch {
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn fmt_bin(bin: &Option<usize>) -> String {
    match bin {
        Some(k) => format!(" at bin {}", k),
        None => String::new(),
    }
}

impl WilsonError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_positive_definite<S: Into<String>>(message: S) -> Self {
        Self::NotPositiveDefinite {
            message: message.into(),
            bin: None,
        }
    }

    /// Attach the offending frequency bin to a numerical error.
    ///
    /// Errors that already carry a bin, and non-numerical errors, are returned
    /// unchanged.
    pub fn at_bin(self, k: usize) -> Self {
        match self {
            Self::NotPositiveDefinite { message, bin: None } => Self::NotPositiveDefinite {
                message,
                bin: Some(k),
            },
            Self::SingularMatrix {
                bin: None,
                condition,
            } => Self::SingularMatrix {
                bin: Some(k),
                condition,
            },
            other => other,
        }
    }

    /// Frequency bin the error refers to, if any.
    pub fn bin(&self) -> Option<usize> {
        match self {
            Self::NotPositiveDefinite { bin, .. } | Self::SingularMatrix { bin, .. } => *bin,
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::NotPositiveDefinite { .. } => "NOT_POSITIVE_DEFINITE",
            Self::SingularMatrix { .. } => "SINGULAR_MATRIX",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Internal contract violations, as opposed to bad input or bad numerics.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, WilsonError>;
