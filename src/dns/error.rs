use crate::repository::resolver::ResolveError;
use std::fmt::Display;

#[derive(Debug)]
pub enum HandleError {
    /// Datagram too short to carry a question section.
    EmptyQuery,
    Resolve(ResolveError),
}

impl Display for HandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "datagram too short"),
            Self::Resolve(inner) => write!(f, "resolution failed: {inner}"),
        }
    }
}

impl From<ResolveError> for HandleError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(value)
    }
}
