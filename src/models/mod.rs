//! Data models for prepared requests and exchange responses.

pub mod request;
pub mod response;

pub use request::ResolvedRequest;
pub use response::ExchangeResponse;
