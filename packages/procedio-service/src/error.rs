pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Malformed model output: {message}")]
	MalformedModelOutput { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Request cancelled.")]
	Cancelled,
}
impl From<procedio_storage::Error> for Error {
	fn from(err: procedio_storage::Error) -> Self {
		match err {
			procedio_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			procedio_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			procedio_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
