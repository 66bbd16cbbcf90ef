mod cache;
mod token;
mod user;

pub use cache::{CacheEntry, CacheError, EntryInfo, SWEEP_INTERVAL, TtlCache};
pub use token::{REFRESH_MARGIN_MS, TOKEN_VALIDITY_MS, TokenRefresher, TokenStore};
pub use user::UserIdMapping;
