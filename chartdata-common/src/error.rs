use std::result;
use thiserror::Error;

pub type Result<T> = result::Result<T, ChartDataError>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub contexts: Vec<String>,
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, context) in self.contexts.iter().enumerate() {
            writeln!(f, "    Context[{i}]: {context}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ChartDataError {
    #[error("Data model configuration error: {0}\n{1}")]
    ConfigurationError(String, ErrorContext),

    #[error("Data request error: {0}\n{1}")]
    RequestError(String, ErrorContext),

    #[error("Internal error: {0}\n{1}")]
    InternalError(String, ErrorContext),
}

impl ChartDataError {
    /// Append a new context level to the error
    pub fn with_context<S, F>(self, context_fn: F) -> Self
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        use ChartDataError::*;
        match self {
            ConfigurationError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                ChartDataError::ConfigurationError(msg, context)
            }
            RequestError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                ChartDataError::RequestError(msg, context)
            }
            InternalError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                ChartDataError::InternalError(msg, context)
            }
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError(message.into(), Default::default())
    }

    pub fn request<S: Into<String>>(message: S) -> Self {
        Self::RequestError(message.into(), Default::default())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::InternalError(message.into(), Default::default())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ChartDataError::ConfigurationError(..))
    }

    pub fn is_request(&self) -> bool {
        matches!(self, ChartDataError::RequestError(..))
    }

    /// Copy of the error for handing one failure to every member of a batch
    pub fn duplicate(&self) -> Self {
        use ChartDataError::*;
        match self {
            ConfigurationError(msg, context) => {
                ChartDataError::ConfigurationError(msg.clone(), context.clone())
            }
            RequestError(msg, context) => ChartDataError::RequestError(msg.clone(), context.clone()),
            InternalError(msg, context) => {
                ChartDataError::InternalError(msg.clone(), context.clone())
            }
        }
    }
}

pub trait ResultWithContext<R> {
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<R, E> ResultWithContext<R> for result::Result<R, E>
where
    E: Into<ChartDataError>,
{
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => {
                let chart_data_error: ChartDataError = err.into();
                Err(chart_data_error.with_context(context_fn))
            }
        }
    }
}

impl<R> ResultWithContext<R> for Option<R> {
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Some(val) => Ok(val),
            None => Err(ChartDataError::internal(context_fn().into())),
        }
    }
}

pub trait DuplicateResult {
    fn duplicate(&self) -> Self;
}

impl<T> DuplicateResult for Result<T>
where
    T: Clone,
{
    fn duplicate(&self) -> Self {
        match self {
            Ok(v) => Ok(v.clone()),
            Err(err) => Err(err.duplicate()),
        }
    }
}
