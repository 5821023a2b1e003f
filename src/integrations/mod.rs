//! External service integrations.

pub mod bigdata {
    pub use crate::services::*;
}

pub mod openai {
    pub use crate::openai_client::*;
}
