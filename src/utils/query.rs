use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub type QueryParams = HashMap<String, String>;

fn present<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_as<T: FromStr>(params: &QueryParams, key: &str, expected: &str) -> AppResult<Option<T>> {
    present(params, key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| AppError::bad_request(format!("{key} must be {expected}")))
        })
        .transpose()
}

pub fn required_uuid(params: &QueryParams, key: &str) -> AppResult<Uuid> {
    optional_uuid(params, key)?.ok_or_else(|| AppError::bad_request(format!("{key} is required")))
}

pub fn optional_uuid(params: &QueryParams, key: &str) -> AppResult<Option<Uuid>> {
    parse_as(params, key, "a UUID")
}

pub fn optional_bool(params: &QueryParams, key: &str) -> AppResult<Option<bool>> {
    parse_as(params, key, "true or false")
}

pub fn optional_date(params: &QueryParams, key: &str) -> AppResult<Option<NaiveDate>> {
    present(params, key)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::bad_request(format!("{key} must be a YYYY-MM-DD date")))
        })
        .transpose()
}

pub fn optional_str<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    present(params, key)
}
