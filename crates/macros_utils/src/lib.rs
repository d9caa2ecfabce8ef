//! Route registration helpers for the actix-web apps.
//!
//! ```ignore
//! macros_utils::routes! {
//!     route health_route,
//!     module api,
//! }
//! ```
//!
//! expands to a `pub fn routes(cfg: &mut ServiceConfig)` that registers
//! `health_route` directly and mounts `api::routes` under `/api`.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($($kind:ident $name:ident),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $( $crate::__route_entry!(cfg, $kind $name); )*
        }
    };
}

#[cfg(feature = "actix")]
#[doc(hidden)]
#[macro_export]
macro_rules! __route_entry {
    ($cfg:ident, route $name:ident) => {
        $cfg.service($name);
    };
    ($cfg:ident, module $name:ident) => {
        $cfg.service(
            $crate::actix_web::web::scope(concat!("/", stringify!($name))).configure($name::routes),
        );
    };
}
