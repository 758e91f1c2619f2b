//! External service integrations.

pub mod auth {
    pub use crate::auth::*;
}

pub mod document_store {
    pub use crate::document_store::*;
}

pub mod notifier {
    pub use crate::notifier::*;
}

pub mod sink {
    pub use crate::sink::*;
}
