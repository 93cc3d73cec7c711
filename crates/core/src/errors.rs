use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid customer field `{field}`: {reason}")]
    InvalidCustomer { field: &'static str, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("write conflict: {0}")]
    Conflict(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in operator output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidCustomer { .. }) => "validation",
            Self::Persistence(_) => "persistence",
            Self::Conflict(_) => "conflict",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_maps_to_validation_class() {
        let error = ApplicationError::from(DomainError::InvalidCustomer {
            field: "phone",
            reason: "too short".to_owned(),
        });

        assert_eq!(error.error_class(), "validation");
        assert_eq!(error.to_string(), "invalid customer field `phone`: too short");
    }

    #[test]
    fn infrastructure_errors_keep_distinct_classes() {
        let persistence = ApplicationError::Persistence("database is locked".to_owned());
        let conflict = ApplicationError::Conflict("customer vanished".to_owned());

        assert_eq!(persistence.error_class(), "persistence");
        assert_eq!(conflict.error_class(), "conflict");
        assert_eq!(conflict.to_string(), "write conflict: customer vanished");
    }
}
