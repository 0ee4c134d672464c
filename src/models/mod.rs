mod api;

pub use api::{FortuneRequest, FortuneResponse, HealthResponse, RootResponse};
