use actix_web::HttpResponse;
use dispatch_core::{DispatchError, ErrorCode};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn dispatch_error(err: DispatchError) -> HttpResponse {
    let body = ErrorResponse { error: err.message };
    match err.code {
        ErrorCode::Validation => HttpResponse::BadRequest().json(body),
        ErrorCode::NotFound => HttpResponse::NotFound().json(body),
        ErrorCode::InvalidTransition | ErrorCode::Conflict => HttpResponse::Conflict().json(body),
        ErrorCode::Inconsistent => HttpResponse::InternalServerError().json(body),
        ErrorCode::Store => HttpResponse::BadGateway().json(body),
    }
}

pub fn respond<T: Serialize>(result: Result<T, DispatchError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(err) => dispatch_error(err),
    }
}

pub fn parse_id<T: FromStr>(value: &str) -> Result<T, HttpResponse> {
    value.parse::<T>().map_err(|_| bad_request("invalid id"))
}
