pub mod controller;
pub mod gateway;

pub use controller::{
    ControllerApi, ControllerError, HttpControllerClient, MockControllerApi, PendingDevice,
};
pub use gateway::{ChatGateway, DiscordGateway, GatewayError, MockGateway};
