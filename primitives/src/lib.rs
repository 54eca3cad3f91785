#![cfg_attr(not(feature = "std"), no_std)]

pub mod allocation;
pub mod backends;
pub mod ecosystem;
pub mod selector;

pub use backends::*;
pub use ecosystem::*;
