use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by the stream resampler.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// A conversion engine session could not be created for the requested configuration.
    AllocationError(Box<dyn error::Error + Send + Sync>),
    /// A numeric quality level which has no named `Quality` counterpart.
    UnsupportedQuality(u32),
    ParameterError(String),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationError(err) => {
                write!(f, "Failed to allocate resampler engine: {err}")
            }
            Self::UnsupportedQuality(level) => {
                write!(f, "Unsupported resampling quality level: {level}")
            }
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

#[cfg(feature = "wav-demo")]
impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Error {
        match err {
            hound::Error::IoError(err) => Error::IoError(err),
            err => Error::ParameterError(err.to_string()),
        }
    }
}
