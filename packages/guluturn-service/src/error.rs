pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Session is already committed.")]
	SessionCommitted,
	#[error("Parser error: {message}")]
	Parser { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error(transparent)]
	Domain(#[from] guluturn_domain::Error),
}
impl From<guluturn_providers::Error> for Error {
	fn from(err: guluturn_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
