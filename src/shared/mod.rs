pub mod constants;
pub mod flash;
#[cfg(test)]
pub mod test_helpers;
pub mod validation;
pub mod views;
