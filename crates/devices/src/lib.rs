#![forbid(unsafe_code)]

pub mod lpc;
pub mod smc;

pub use lpc::{map_rcba, RcbaWindow};
pub use smc::{register_applesmc, AppleSmc, SharedAppleSmc};
