mod fortune;
mod health;

pub use fortune::get_fortune;
pub use health::{health_check, root};
