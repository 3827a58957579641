pub mod dgs;
pub mod error;
pub mod id;
pub mod replay;
pub mod trace;

pub use error::{Error, Result};

#[cfg(test)]
mod test;
