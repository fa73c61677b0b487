//! Session authentication with server-side logout.
//!
//! Session tokens are stateless JWTs. Logout records the token in a revocation
//! list that every authenticated request consults, and entries drop out of the
//! list once the token would have expired anyway.

mod blacklist;
mod cookie;
mod errors;
mod extract;
mod extractors;
mod state;
mod types;
mod validator;

pub use blacklist::{BlacklistStore, MemoryBlacklist, StoreError, TokenDigest, token_digest};
pub use cookie::{SESSION_COOKIE_NAME, clear_session_cookie, get_cookie, session_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extract::extract_token;
pub use extractors::Auth;
pub use state::HasAuthBackend;
pub use types::{Authenticated, Principal};
pub use validator::{AuthValidator, UserLookup};
