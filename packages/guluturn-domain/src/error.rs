pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read tag taxonomy at {path:?}.")]
	ReadTaxonomy { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse tag taxonomy.")]
	ParseTaxonomy { source: toml::de::Error },
	#[error("Invalid tag taxonomy: {message}")]
	InvalidTaxonomy { message: String },
	#[error("Invalid configuration: {message}")]
	InvalidConfig { message: String },
}
