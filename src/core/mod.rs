// Domain-layer modules: routing tables, payloads and delivery
pub mod routing {
    pub use crate::routing::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod retry {
    pub use crate::retry::*;
}

pub mod router {
    pub use crate::router::*;
}
