// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod vault_handler {
    pub use crate::vault_handler::*;
}

pub mod routes {
    pub use crate::routes::*;
}
