mod values;

pub use values::*;

#[cfg(test)]
mod val_test;
