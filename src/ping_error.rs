use std::{error::Error, fmt};

pub type GenericError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug)]
pub struct PingError {
    pub message: String,
    pub source: Option<GenericError>,
}

impl PingError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        PingError {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "PingError")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<std::io::Error> for PingError {
    fn from(error: std::io::Error) -> PingError {
        PingError {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

impl From<ctrlc::Error> for PingError {
    fn from(error: ctrlc::Error) -> PingError {
        PingError {
            message: format!("could not install interrupt handler: {error}"),
            source: Some(Box::new(error)),
        }
    }
}
