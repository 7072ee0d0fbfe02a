pub mod city;
pub mod config;
pub mod db;
pub mod error;
pub mod intel;
pub mod llm;
pub mod routes;
pub mod telemetry;

pub use config::Config;

use city::CityService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cities: CityService,
}
