use std::fmt;

use diesel::result::Error as DieselError;
use failure::{Backtrace, Context, Fail};
use serde_json;
use validator::ValidationErrors;

use client::email::ErrorKind as EmailErrorKind;
use client::stripe::ErrorKind as StripeErrorKind;
use repos::ErrorKind as RepoErrorKind;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, Debug, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "service error - internal")]
    Internal,
    #[fail(display = "service error - forbidden")]
    Forbidden,
    #[fail(display = "service error - not found")]
    NotFound,
    #[fail(display = "service error - invalid input, errors: {}", _0)]
    Validation(serde_json::Value),
    #[fail(display = "service error - malformed input")]
    MalformedInput,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "service error source - r2d2")]
    R2d2,
    #[fail(display = "service error source - diesel")]
    Diesel,
    #[fail(display = "service error source - validation")]
    Validation,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "service error context - no authorized user")]
    Unauthorized,
    #[fail(display = "service error context - lot not found")]
    LotNotFound,
    #[fail(display = "service error context - lot is closed")]
    LotClosed,
    #[fail(display = "service error context - schedule not found")]
    ScheduleNotFound,
    #[fail(display = "service error context - schedule is not bookable now")]
    ScheduleNotActive,
    #[fail(display = "service error context - price tier not found")]
    PriceTierNotFound,
    #[fail(display = "service error context - order not found")]
    OrderNotFound,
    #[fail(display = "service error context - user not found")]
    UserNotFound,
    #[fail(display = "service error context - payment intent status")]
    PaymentIntentStatus,
    #[fail(display = "service error context - payment status transition")]
    PaymentStatusTransition,
    #[fail(display = "service error context - only admins change roles")]
    RoleChange,
    #[fail(display = "service error context - bookings refer to the record")]
    HasOrders,
}

derive_error_impls!();

impl From<RepoErrorKind> for ErrorKind {
    fn from(e: RepoErrorKind) -> Self {
        match e {
            RepoErrorKind::Internal => ErrorKind::Internal,
            RepoErrorKind::Forbidden => ErrorKind::Forbidden,
            RepoErrorKind::NotFound => ErrorKind::NotFound,
            RepoErrorKind::Constraints(validation_errors) => validation_errors.into(),
        }
    }
}

impl From<StripeErrorKind> for ErrorKind {
    fn from(e: StripeErrorKind) -> Self {
        match e {
            StripeErrorKind::MalformedInput => ErrorKind::MalformedInput,
            StripeErrorKind::NotFound => ErrorKind::NotFound,
            StripeErrorKind::Validation(payload) => ErrorKind::Validation(payload),
            StripeErrorKind::Unauthorized | StripeErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<EmailErrorKind> for ErrorKind {
    fn from(_e: EmailErrorKind) -> Self {
        ErrorKind::Internal
    }
}

impl From<ValidationErrors> for ErrorKind {
    fn from(errors: ValidationErrors) -> Self {
        ErrorKind::Validation(serde_json::to_value(errors).unwrap_or_default())
    }
}

/// Lets repo calls run inside `Connection::transaction`
impl From<DieselError> for Error {
    fn from(e: DieselError) -> Self {
        ectx!(err e, ErrorSource::Diesel, ErrorKind::Internal)
    }
}

/// Wraps failed payload checks into a validation error carrying the field errors
pub fn validation_error(errors: ValidationErrors) -> Error {
    let kind = ErrorKind::from(errors.clone());
    let e = format_err!("{}", errors);
    ectx!(err e, ErrorSource::Validation, kind)
}
