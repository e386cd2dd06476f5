mod inference_service;
mod model_service;
mod ort_service;
mod preprocess;
mod routes;
mod server;
mod telemetry;

pub mod config;
pub mod labels;

pub use inference_service::Classification;
pub use server::start_server;
