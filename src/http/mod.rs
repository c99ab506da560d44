//! Generic http plumbing: the hyper application, request helpers and the
//! outgoing client

pub mod client;
pub mod controller;
pub mod errors;
pub mod request_util;
