//! External service integrations.

pub mod transport {
    pub use crate::transport::*;
}

pub mod environment {
    pub use crate::environment::*;
}
