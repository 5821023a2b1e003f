// Domain-layer modules and shared errors/models
pub mod document {
    pub use crate::document::*;
}

pub mod extraction {
    pub use crate::extraction::*;
}

pub mod expansion {
    pub use crate::expansion::*;
}

pub mod analysis {
    pub use crate::analysis::*;
}

pub mod inquiry {
    pub use crate::inquiry::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
