use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}
