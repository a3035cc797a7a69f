#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]

/// Compile-time assertion on constant expressions.
#[macro_export]
macro_rules! static_assert {
    ($cond:expr, $msg:expr) => {
        const _: () = assert!($cond, $msg);
    };
}

pub mod config;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod proxy;
pub mod runtime;
pub mod serializer;
pub mod storage;
