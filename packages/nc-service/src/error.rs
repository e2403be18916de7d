pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Input shape error: {message}")]
	InputShape { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error(transparent)]
	Config(#[from] nc_config::Error),
}
