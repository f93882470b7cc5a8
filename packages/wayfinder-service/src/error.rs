pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<wayfinder_storage::Error> for Error {
	fn from(err: wayfinder_storage::Error) -> Self {
		match err {
			wayfinder_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			wayfinder_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			wayfinder_storage::Error::NotFound(message) => Self::NotFound { message },
			wayfinder_storage::Error::Conflict(message) => Self::Storage { message },
		}
	}
}
impl From<wayfinder_config::Error> for Error {
	fn from(err: wayfinder_config::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
