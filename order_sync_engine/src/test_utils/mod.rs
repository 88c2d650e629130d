mod fixtures;
mod prepare_env;

pub use fixtures::*;
pub use prepare_env::prepare_test_env;
