pub mod health;
pub mod inventory;
pub mod menu;
pub mod metrics;
pub mod orders;
pub mod reports;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path or body identifier into its typed form.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
