//! Concrete backends for the domain's capability traits.

pub mod command;
pub mod geolocation;
pub mod scanner;

pub use command::{CommandGpsSource, SurveySource};
pub use geolocation::{GeolocationApiSource, IpGeolocationSource};
pub use scanner::CommandScanner;
