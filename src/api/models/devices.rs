use serde::Serialize;

pub use crate::repositories::devices::Device;

#[derive(Debug, Serialize)]
pub struct DevicesListResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    #[serde(flatten)]
    pub device: Device,
}
