mod device;
mod device_repository;
mod in_memory_device_repository;
mod result;

pub use device::*;
pub use device_repository::*;
pub use in_memory_device_repository::*;
pub use result::*;
