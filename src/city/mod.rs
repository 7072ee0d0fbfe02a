pub mod model;
pub mod service;
pub mod store;
pub mod text;

pub use model::{
    City, CityCard, CityListItem, CityRequest, CityRequestCreate, CityResponse, CityStatus,
    CreateCityRequest,
};
pub use service::CityService;
pub use store::{Claim, CityStore, MemoryCityStore, PgCityStore};
pub use text::{country_flag, slugify};
