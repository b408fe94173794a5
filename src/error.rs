use thiserror::Error;

pub type TelaResult<T> = Result<T, TelaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelaError {
    #[error("Parse error at offset {position}: {message} (near '{fragment}')")]
    Parse {
        position: usize,
        fragment: String,
        message: String,
    },

    #[error("Schema error in component '{component}': {message}")]
    Schema { component: String, message: String },

    #[error("Unknown attribute '{attribute}' for component '{component}'")]
    UnknownAttribute {
        component: String,
        attribute: String,
    },

    #[error("Invalid value for attribute '{attribute}': expected {expected}, got {got}")]
    InvalidValue {
        attribute: String,
        expected: String,
        got: String,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}'. Expected one of: {allowed}")]
    InvalidEnum {
        attribute: String,
        value: String,
        allowed: String,
    },

    #[error("Missing required attribute '{attribute}' for component '{component}'")]
    MissingAttribute {
        component: String,
        attribute: String,
    },

    #[error("Unknown component '{name}'")]
    UnknownComponent { name: String },

    #[error("Attribute '{attribute}' of component '{component}' cannot be specified as a subtag")]
    NotASubtag {
        component: String,
        attribute: String,
    },

    #[error("Component '{component}' is misconfigured: {message}")]
    Config { component: String, message: String },

    #[error("Cannot read file '{path}'. Search paths: {}", .search_paths.join(", "))]
    FileNotFound {
        path: String,
        search_paths: Vec<String>,
    },

    #[error("View '{name}' not found. Search paths: {}", .search_paths.join(", "))]
    ViewNotFound {
        name: String,
        search_paths: Vec<String>,
    },

    #[error("Invalid view model: {0}")]
    InvalidModel(String),
}
