//! Data Transfer Objects for the HTTP surface.

pub mod http;
