mod executor;
mod host;

pub use executor::*;
pub use host::*;
