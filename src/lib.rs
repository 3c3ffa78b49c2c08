pub mod cluster;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
