pub mod config;
pub mod module;
pub mod util;
pub mod val;

// Call stack and scope resolution
pub mod vm;

#[cfg(test)]
mod config_test;
