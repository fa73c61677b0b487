//! Authentication state trait and macro.

use super::validator::AuthValidator;

/// Trait for state types that can authenticate requests.
pub trait HasAuthBackend {
    fn validator(&self) -> &AuthValidator;
    fn secure_cookies(&self) -> bool;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `validator: AuthValidator`
/// - `secure_cookies: bool`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub validator: AuthValidator,
///     pub secure_cookies: bool,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn validator(&self) -> &$crate::auth::AuthValidator {
                &self.validator
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
