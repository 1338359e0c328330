//! Company-code gate and operator sessions.
//!
//! This crate is decoupled from HTTP and storage: the code itself is loaded
//! by the caller, and sessions live only in process memory.

pub mod gate;
pub mod session;

pub use gate::{check_code, AuthError, CompanyCode, DEFAULT_COMPANY_CODE};
pub use session::{Session, SessionRegistry, SessionToken};
