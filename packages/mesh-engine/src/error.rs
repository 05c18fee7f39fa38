use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidArgument { message: String },
	#[error("Session not found: {session_id}")]
	SessionNotFound { session_id: Uuid },
	#[error("Provider unavailable: {message}")]
	ProviderUnavailable { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Deadline exceeded during {stage}.")]
	Timeout { stage: String },
}

impl From<mesh_store::Error> for Error {
	fn from(err: mesh_store::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
