mod authoring;
mod middleware;
mod public;
mod session;

pub use public::{HttpState, build_router};
pub use session::SESSION_COOKIE;
