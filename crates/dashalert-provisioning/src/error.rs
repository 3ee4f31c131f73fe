use dashalert_common::error::ErrorKind;

/// Conversion failures at the provisioning boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Provisioning: invalid {field} value '{value}'")]
    InvalidEnum { field: &'static str, value: String },

    #[error("Provisioning: {field} must not be negative, got {value}")]
    InvalidDuration { field: &'static str, value: i64 },
}

impl ProvisioningError {
    /// Every provisioning error is caller input that will not succeed on retry.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Invalid
    }
}

pub type Result<T> = std::result::Result<T, ProvisioningError>;
