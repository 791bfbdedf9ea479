use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};

use crate::format::stream_description::StreamDescription;
use crate::object::property_address::{ObjectId, PropertyAddress};
use crate::utils::byteorder::ByteValue;
use crate::utils::errors::{AUDIO_PARAM, AudioObjectError, HARDWARE_ILLEGAL_OPERATION};

/// Callback invoked with the object and the addresses whose values changed.
pub type PropertyListener = Arc<dyn Fn(ObjectId, &[PropertyAddress]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub(crate) u64);

/// Access to the properties of audio objects.
///
/// Property data travels as raw bytes in host byte order, exactly as the
/// host lays out the corresponding structures.
pub trait PropertyBackend {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool;

    fn is_property_settable(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<bool, AudioObjectError>;

    fn property_data_size(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
    ) -> Result<usize, AudioObjectError>;

    fn property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
    ) -> Result<Vec<u8>, AudioObjectError>;

    fn set_property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        qualifier: Option<&[u8]>,
        data: &[u8],
    ) -> Result<(), AudioObjectError>;

    /// Reads a property holding a string reference.
    fn string_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<String, AudioObjectError>;

    fn add_property_listener(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        listener: PropertyListener,
    ) -> Result<ListenerToken, AudioObjectError>;

    fn remove_property_listener(&self, token: ListenerToken) -> Result<(), AudioObjectError>;
}

#[derive(Debug, Clone)]
enum PropertyValue {
    Data(Vec<u8>),
    String(String),
}

#[derive(Debug, Clone)]
struct Property {
    value: PropertyValue,
    settable: bool,
}

struct Registration {
    object: ObjectId,
    address: PropertyAddress,
    listener: PropertyListener,
}

/// In-process property store.
///
/// Properties are matched on their exact address. Setting a property
/// notifies every listener registered on a congruent address of the same
/// object, after the store lock is released.
#[derive(Default)]
pub struct MemoryBackend {
    properties: Mutex<HashMap<(ObjectId, PropertyAddress), Property>>,
    listeners: Mutex<HashMap<u64, Registration>>,
    next_token: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, object: ObjectId, address: PropertyAddress, value: PropertyValue, settable: bool) {
        trace!("Storing property {address} on object {object}");
        lock(&self.properties).insert((object, address), Property { value, settable });
    }

    pub fn insert_data(
        &self,
        object: ObjectId,
        address: PropertyAddress,
        data: Vec<u8>,
        settable: bool,
    ) {
        self.insert(object, address, PropertyValue::Data(data), settable);
    }

    pub fn insert_scalar<T: ByteValue>(&self, object: ObjectId, address: PropertyAddress, value: T) {
        self.insert_array(object, address, &[value]);
    }

    pub fn insert_settable_scalar<T: ByteValue>(
        &self,
        object: ObjectId,
        address: PropertyAddress,
        value: T,
    ) {
        let mut data = vec![0u8; T::SIZE];
        value.put_ne(&mut data);
        self.insert_data(object, address, data, true);
    }

    pub fn insert_array<T: ByteValue>(&self, object: ObjectId, address: PropertyAddress, values: &[T]) {
        let mut data = vec![0u8; T::SIZE * values.len()];
        for (chunk, value) in data.chunks_exact_mut(T::SIZE).zip(values) {
            value.put_ne(chunk);
        }
        self.insert_data(object, address, data, false);
    }

    pub fn insert_string(&self, object: ObjectId, address: PropertyAddress, value: &str) {
        self.insert(object, address, PropertyValue::String(value.to_string()), false);
    }

    pub fn insert_format(
        &self,
        object: ObjectId,
        address: PropertyAddress,
        format: &StreamDescription,
        settable: bool,
    ) {
        self.insert_data(object, address, format.to_ne_bytes().to_vec(), settable);
    }

    pub fn remove(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        lock(&self.properties).remove(&(object, *address)).is_some()
    }

    fn property(&self, object: ObjectId, address: &PropertyAddress) -> Result<Property, AudioObjectError> {
        lock(&self.properties)
            .get(&(object, *address))
            .cloned()
            .ok_or_else(|| AudioObjectError::UnknownProperty(address.to_string(), object))
    }

    fn data(&self, object: ObjectId, address: &PropertyAddress) -> Result<Vec<u8>, AudioObjectError> {
        match self.property(object, address)?.value {
            PropertyValue::Data(data) => Ok(data),
            // The host hands out string references, not their bytes
            PropertyValue::String(_) => Ok(vec![0u8; size_of::<usize>()]),
        }
    }

    fn notify(&self, object: ObjectId, address: &PropertyAddress) {
        let listeners: Vec<PropertyListener> = lock(&self.listeners)
            .values()
            .filter(|r| r.object == object && r.address.congruent(address))
            .map(|r| Arc::clone(&r.listener))
            .collect();
        debug!(
            "Property {address} changed on object {object}, notifying {} listeners",
            listeners.len()
        );
        for listener in listeners {
            listener(object, std::slice::from_ref(address));
        }
    }
}

impl PropertyBackend for MemoryBackend {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        lock(&self.properties).contains_key(&(object, *address))
    }

    fn is_property_settable(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<bool, AudioObjectError> {
        Ok(self.property(object, address)?.settable)
    }

    fn property_data_size(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        _qualifier: Option<&[u8]>,
    ) -> Result<usize, AudioObjectError> {
        self.data(object, address).map(|data| data.len())
    }

    fn property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        _qualifier: Option<&[u8]>,
    ) -> Result<Vec<u8>, AudioObjectError> {
        self.data(object, address)
    }

    fn set_property_data(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        _qualifier: Option<&[u8]>,
        data: &[u8],
    ) -> Result<(), AudioObjectError> {
        {
            let mut properties = lock(&self.properties);
            let property = properties
                .get_mut(&(object, *address))
                .ok_or_else(|| AudioObjectError::UnknownProperty(address.to_string(), object))?;
            if !property.settable {
                return Err(AudioObjectError::Status {
                    operation: "AudioObjectSetPropertyData",
                    status: HARDWARE_ILLEGAL_OPERATION,
                });
            }
            let expected = match &property.value {
                PropertyValue::Data(current) => current.len(),
                PropertyValue::String(_) => {
                    return Err(AudioObjectError::Status {
                        operation: "AudioObjectSetPropertyData",
                        status: HARDWARE_ILLEGAL_OPERATION,
                    });
                }
            };
            if expected != data.len() {
                return Err(AudioObjectError::BadPropertySize {
                    property: address.to_string(),
                    expected,
                    actual: data.len(),
                });
            }
            property.value = PropertyValue::Data(data.to_vec());
        }

        self.notify(object, address);
        Ok(())
    }

    fn string_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
    ) -> Result<String, AudioObjectError> {
        match self.property(object, address)?.value {
            PropertyValue::String(s) => Ok(s),
            PropertyValue::Data(_) => Err(AudioObjectError::NotAString(address.to_string())),
        }
    }

    fn add_property_listener(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        listener: PropertyListener,
    ) -> Result<ListenerToken, AudioObjectError> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).insert(
            token,
            Registration {
                object,
                address: *address,
                listener,
            },
        );
        Ok(ListenerToken(token))
    }

    fn remove_property_listener(&self, token: ListenerToken) -> Result<(), AudioObjectError> {
        match lock(&self.listeners).remove(&token.0) {
            Some(_) => Ok(()),
            None => Err(AudioObjectError::Status {
                operation: "AudioObjectRemovePropertyListener",
                status: AUDIO_PARAM,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::property_address::{PropertyAddress, scope, selector};
    use std::sync::atomic::AtomicUsize;

    const DEVICE: ObjectId = 42;

    #[test]
    fn scalar_round_trip_and_settable() {
        let backend = MemoryBackend::new();
        let rate = PropertyAddress::global(selector::NOMINAL_SAMPLE_RATE);
        backend.insert_settable_scalar(DEVICE, rate, 44100.0f64);

        assert!(backend.has_property(DEVICE, &rate));
        assert!(!backend.has_property(DEVICE + 1, &rate));
        assert_eq!(backend.is_property_settable(DEVICE, &rate), Ok(true));
        assert_eq!(backend.property_data_size(DEVICE, &rate, None), Ok(8));

        backend
            .set_property_data(DEVICE, &rate, None, &48000.0f64.to_ne_bytes())
            .unwrap();
        assert_eq!(
            backend.property_data(DEVICE, &rate, None),
            Ok(48000.0f64.to_ne_bytes().to_vec())
        );
        assert!(matches!(
            backend.set_property_data(DEVICE, &rate, None, &[0; 4]),
            Err(AudioObjectError::BadPropertySize { expected: 8, actual: 4, .. })
        ));
    }

    #[test]
    fn read_only_and_missing() {
        let backend = MemoryBackend::new();
        let name = PropertyAddress::global(selector::NAME);
        backend.insert_string(DEVICE, name, "Speakers");

        assert_eq!(backend.string_property(DEVICE, &name).as_deref(), Ok("Speakers"));
        assert!(matches!(
            backend.set_property_data(DEVICE, &name, None, &[0; 8]),
            Err(AudioObjectError::Status { .. })
        ));

        let uid = PropertyAddress::global(selector::DEVICE_UID);
        assert!(matches!(
            backend.string_property(DEVICE, &uid),
            Err(AudioObjectError::UnknownProperty(_, DEVICE))
        ));
        assert!(backend.remove(DEVICE, &name));
        assert!(!backend.has_property(DEVICE, &name));
    }

    #[test]
    fn listeners_fire_on_congruent_addresses() {
        let backend = MemoryBackend::new();
        let size = PropertyAddress::scoped(selector::BUFFER_FRAME_SIZE, scope::OUTPUT);
        backend.insert_settable_scalar(DEVICE, size, 512u32);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let token = backend
            .add_property_listener(
                DEVICE,
                &PropertyAddress::wildcard(),
                Arc::new(move |object: ObjectId, addresses: &[PropertyAddress]| {
                    assert_eq!(object, DEVICE);
                    assert_eq!(addresses[0].selector, selector::BUFFER_FRAME_SIZE);
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        let unrelated = backend
            .add_property_listener(
                DEVICE,
                &PropertyAddress::global(selector::NAME),
                Arc::new(|_: ObjectId, _: &[PropertyAddress]| {
                    panic!("unrelated listener called")
                }),
            )
            .unwrap();

        backend
            .set_property_data(DEVICE, &size, None, &256u32.to_ne_bytes())
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        backend.remove_property_listener(token).unwrap();
        backend.remove_property_listener(unrelated).unwrap();
        assert!(backend.remove_property_listener(token).is_err());
        backend
            .set_property_data(DEVICE, &size, None, &128u32.to_ne_bytes())
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
