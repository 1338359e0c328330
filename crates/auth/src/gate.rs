use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default shared code used when none has been configured yet.
pub const DEFAULT_COMPANY_CODE: &str = "2026";

/// The single shared code that unlocks the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyCode(String);

impl CompanyCode {
    pub fn new(code: impl Into<String>) -> Result<Self, AuthError> {
        let code = code.into().trim().to_string();
        if code.is_empty() {
            return Err(AuthError::BlankCode);
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CompanyCode {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompanyCode> for String {
    fn from(value: CompanyCode) -> Self {
        value.0
    }
}

impl Default for CompanyCode {
    fn default() -> Self {
        Self(DEFAULT_COMPANY_CODE.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("company code is required")]
    BlankInput,

    #[error("company code does not match")]
    InvalidCode,

    #[error("company code cannot be blank")]
    BlankCode,

    #[error("session is missing or has ended")]
    UnknownSession,
}

/// Compare operator input against the stored code.
///
/// Blank input is rejected before any comparison takes place.
pub fn check_code(expected: &CompanyCode, input: &str) -> Result<(), AuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::BlankInput);
    }
    if input != expected.as_str() {
        return Err(AuthError::InvalidCode);
    }
    Ok(())
}
