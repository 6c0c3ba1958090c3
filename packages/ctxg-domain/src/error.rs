pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {field}: {message}")]
	Validation { field: String, message: String },
	#[error("Invalid stored record: {message}")]
	InvalidRecord { message: String },
}
impl Error {
	pub fn validation(field: &str, message: impl Into<String>) -> Self {
		Self::Validation { field: field.to_string(), message: message.into() }
	}
}
