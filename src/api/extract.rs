use super::error::{ApiError, ApiResult};
use crate::auth::{Caller, OWNER_HEADER};
use crate::calendar;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::NaiveDate;
use std::convert::Infallible;

/// A missing or blank `X-Owner-Id` yields an anonymous caller; handlers decide
/// whether that degrades the response or rejects it.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|value| value.to_str().ok());

        Ok(Caller::from_header(header))
    }
}

pub fn parse_date_param(raw: &str) -> ApiResult<NaiveDate> {
    calendar::parse_date(raw).map_err(|error| ApiError::BadRequest(error.to_string()))
}

/// The date a statistic or view is anchored at: the given one or today.
pub fn anchor_date(raw: Option<&str>) -> ApiResult<NaiveDate> {
    raw.map(parse_date_param)
        .transpose()
        .map(|date| date.unwrap_or_else(calendar::today))
}
