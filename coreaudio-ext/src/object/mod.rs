//! Wrappers over audio objects and their properties.
//!
//! Every wrapper answers its properties through a [`PropertyBackend`]:
//! `HalBackend` talks to the host HAL on macOS, [`MemoryBackend`] keeps
//! properties in process.

pub mod audio_object;
pub mod backend;
pub mod device;
#[cfg(target_os = "macos")]
pub mod hal;
pub mod property_address;
pub mod stream;
pub mod system;

pub use audio_object::AudioObject;
pub use backend::{ListenerToken, MemoryBackend, PropertyBackend, PropertyListener};
pub use device::AudioDevice;
#[cfg(target_os = "macos")]
pub use hal::HalBackend;
pub use property_address::{
    DirectionalScope, ObjectId, PropertyAddress, SYSTEM_OBJECT, TransportType, UNKNOWN_OBJECT,
};
pub use stream::AudioStream;
pub use system::AudioSystemObject;
