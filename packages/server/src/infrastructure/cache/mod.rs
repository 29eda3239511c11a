//! Process-local caches.

pub mod display_name;
pub mod merchandise;

pub use display_name::DisplayNameCache;
pub use merchandise::MerchandiseCache;
