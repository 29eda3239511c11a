//! Infrastructure layer: concrete implementations of the domain interfaces
//! and the in-process caches the relay keeps.

pub mod auth;
pub mod cache;
pub mod dto;
pub mod identity;
pub mod registry;
