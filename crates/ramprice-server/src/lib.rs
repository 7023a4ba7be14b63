mod api;

pub use api::{ApiServer, router};
