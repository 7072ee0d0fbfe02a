//! City transit intelligence: the record, how it is requested from a chat
//! model, and how a reply is validated before it is accepted.

pub mod error;
pub mod extract;
pub mod generator;
pub mod links;
pub mod model;
pub mod prompt;
pub mod settings;
pub mod source;

pub use error::IntelError;
pub use generator::IntelGenerator;
pub use links::{HttpLinkChecker, LinkCheck, LinkChecker};
pub use model::{CityIntel, TransportType};
pub use settings::{IntelSettings, SettingsSource};
pub use source::GeneratedIntel;
