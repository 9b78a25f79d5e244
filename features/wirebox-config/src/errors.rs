use wirebox_di::TypeInfo;

/// Errors when trying to acquire a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GetConfigError {
    /// The required Config is not known
    #[error("The config type '{0}' is not known")]
    Missing(TypeInfo),
}

/// Errors when trying to register a config
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterConfigError {
    /// The Config type is already registered
    #[error("The config type '{0}' is already registered")]
    AlreadyRegistered(TypeInfo),
}
