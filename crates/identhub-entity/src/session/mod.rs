//! Session domain entities.

pub mod device;
pub mod model;

pub use device::DeviceType;
pub use model::{Session, SessionWithUser};
