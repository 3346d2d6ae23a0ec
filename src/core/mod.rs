mod error;

pub use error::{DispatchError, Result};
