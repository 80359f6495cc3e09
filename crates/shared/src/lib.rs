pub mod domain;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod records;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
