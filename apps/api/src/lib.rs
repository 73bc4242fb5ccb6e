pub mod config;
pub mod errors;
pub mod export;
pub mod llm_client;
pub mod reconstructor;
pub mod relay;
pub mod report;
pub mod routes;
pub mod state;
pub mod upload;
