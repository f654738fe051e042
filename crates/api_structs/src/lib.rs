mod client;
mod reminder;
mod status;

pub mod dtos {
    pub use crate::client::dtos::*;
    pub use crate::reminder::dtos::*;
}

pub use crate::client::api::*;
pub use crate::reminder::api::*;
pub use crate::status::api::*;
