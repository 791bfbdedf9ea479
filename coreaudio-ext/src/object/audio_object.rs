use std::sync::Arc;

use crate::format::stream_description::{StreamDescription, StreamRangedDescription, ValueRange};
use crate::object::backend::{ListenerToken, PropertyBackend};
use crate::object::property_address::{
    ObjectId, PropertyAddress, UNKNOWN_OBJECT, selector,
};
use crate::utils::byte_stream::ByteStream;
use crate::utils::byteorder::ByteValue;
use crate::utils::errors::AudioObjectError;

/// An audio object: an id and the backend that answers its properties.
pub struct AudioObject<B: PropertyBackend + ?Sized> {
    id: ObjectId,
    backend: Arc<B>,
}

impl<B: PropertyBackend + ?Sized> Clone for AudioObject<B> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: PropertyBackend + ?Sized> std::fmt::Debug for AudioObject<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioObject").field("id", &self.id).finish()
    }
}

impl<B: PropertyBackend + ?Sized> PartialEq for AudioObject<B> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.backend, &other.backend)
    }
}

impl<B: PropertyBackend + ?Sized> AudioObject<B> {
    pub fn new(id: ObjectId, backend: Arc<B>) -> Self {
        Self { id, backend }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_OBJECT
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Another object on the same backend.
    pub(crate) fn sibling(&self, id: ObjectId) -> Self {
        Self::new(id, Arc::clone(&self.backend))
    }

    pub fn has_property(&self, address: &PropertyAddress) -> bool {
        self.backend.has_property(self.id, address)
    }

    pub fn is_settable(&self, address: &PropertyAddress) -> Result<bool, AudioObjectError> {
        self.backend.is_property_settable(self.id, address)
    }

    pub fn data_size(&self, address: &PropertyAddress) -> Result<usize, AudioObjectError> {
        self.backend.property_data_size(self.id, address, None)
    }

    pub fn property_data(&self, address: &PropertyAddress) -> Result<Vec<u8>, AudioObjectError> {
        self.backend.property_data(self.id, address, None)
    }

    pub fn set_property_data(
        &self,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), AudioObjectError> {
        self.backend.set_property_data(self.id, address, None, data)
    }

    /// Reads a fixed size value in host byte order.
    pub fn scalar_property<T: ByteValue>(
        &self,
        address: &PropertyAddress,
    ) -> Result<T, AudioObjectError> {
        let data = self.property_data(address)?;
        if data.len() != T::SIZE {
            return Err(AudioObjectError::BadPropertySize {
                property: address.to_string(),
                expected: T::SIZE,
                actual: data.len(),
            });
        }
        Ok(T::from_ne_slice(&data))
    }

    pub fn set_scalar_property<T: ByteValue>(
        &self,
        address: &PropertyAddress,
        value: T,
    ) -> Result<(), AudioObjectError> {
        let mut data = vec![0u8; T::SIZE];
        value.put_ne(&mut data);
        self.set_property_data(address, &data)
    }

    /// Reads a packed array of values in host byte order.
    pub fn array_property<T: ByteValue>(
        &self,
        address: &PropertyAddress,
    ) -> Result<Vec<T>, AudioObjectError> {
        let data = self.property_data(address)?;
        if data.len() % T::SIZE != 0 {
            return Err(AudioObjectError::BadPropertySize {
                property: address.to_string(),
                expected: data.len() / T::SIZE * T::SIZE,
                actual: data.len(),
            });
        }
        Ok(data.chunks_exact(T::SIZE).map(T::from_ne_slice).collect())
    }

    pub fn string_property(&self, address: &PropertyAddress) -> Result<String, AudioObjectError> {
        self.backend.string_property(self.id, address)
    }

    pub fn stream_description_property(
        &self,
        address: &PropertyAddress,
    ) -> Result<StreamDescription, AudioObjectError> {
        let data = self.property_data(address)?;
        Ok(StreamDescription::from_ne_bytes(&data)?)
    }

    pub fn set_stream_description_property(
        &self,
        address: &PropertyAddress,
        format: &StreamDescription,
    ) -> Result<(), AudioObjectError> {
        self.set_property_data(address, &format.to_ne_bytes())
    }

    pub fn ranged_descriptions_property(
        &self,
        address: &PropertyAddress,
    ) -> Result<Vec<StreamRangedDescription>, AudioObjectError> {
        let data = self.property_data(address)?;
        let mut stream = ByteStream::from(&data[..]);
        let mut descriptions = Vec::with_capacity(data.len() / StreamRangedDescription::NATIVE_SIZE);
        while !stream.at_end() {
            descriptions.push(StreamRangedDescription::read_ne(&mut stream)?);
        }
        Ok(descriptions)
    }

    pub fn value_ranges_property(
        &self,
        address: &PropertyAddress,
    ) -> Result<Vec<ValueRange>, AudioObjectError> {
        let data = self.property_data(address)?;
        let mut stream = ByteStream::from(&data[..]);
        let mut ranges = Vec::with_capacity(data.len() / ValueRange::NATIVE_SIZE);
        while !stream.at_end() {
            ranges.push(ValueRange::read_ne(&mut stream)?);
        }
        Ok(ranges)
    }

    pub fn bool_property(&self, address: &PropertyAddress) -> Result<bool, AudioObjectError> {
        self.scalar_property::<u32>(address).map(|v| v != 0)
    }

    pub fn add_property_listener<F>(
        &self,
        address: &PropertyAddress,
        listener: F,
    ) -> Result<ListenerToken, AudioObjectError>
    where
        F: Fn(ObjectId, &[PropertyAddress]) + Send + Sync + 'static,
    {
        self.backend
            .add_property_listener(self.id, address, Arc::new(listener))
    }

    pub fn remove_property_listener(&self, token: ListenerToken) -> Result<(), AudioObjectError> {
        self.backend.remove_property_listener(token)
    }

    pub fn base_class(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::BASE_CLASS))
    }

    pub fn class(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::CLASS))
    }

    pub fn owner(&self) -> Result<ObjectId, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::OWNER))
    }

    pub fn name(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::NAME))
    }

    pub fn model_name(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::MODEL_NAME))
    }

    pub fn manufacturer(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::MANUFACTURER))
    }

    pub fn element_name(&self, scope: u32, element: u32) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::new(selector::ELEMENT_NAME, scope, element))
    }

    pub fn element_category_name(&self, scope: u32, element: u32) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::new(
            selector::ELEMENT_CATEGORY_NAME,
            scope,
            element,
        ))
    }

    pub fn element_number_name(&self, scope: u32, element: u32) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::new(
            selector::ELEMENT_NUMBER_NAME,
            scope,
            element,
        ))
    }

    pub fn owned_objects(&self) -> Result<Vec<ObjectId>, AudioObjectError> {
        self.array_property(&PropertyAddress::global(selector::OWNED_OBJECTS))
    }

    pub fn serial_number(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::SERIAL_NUMBER))
    }

    pub fn firmware_version(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::FIRMWARE_VERSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::stream_description::CommonPcmFormat;
    use crate::object::backend::MemoryBackend;
    use crate::object::property_address::{class, scope};
    use std::sync::atomic::{AtomicU32, Ordering};

    const OBJECT: ObjectId = 7;

    fn object() -> (Arc<MemoryBackend>, AudioObject<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let object = AudioObject::new(OBJECT, Arc::clone(&backend));
        (backend, object)
    }

    #[test]
    fn identity() {
        let (backend, object) = object();
        assert_eq!(object.id(), OBJECT);
        assert!(!object.is_unknown());
        assert!(AudioObject::new(UNKNOWN_OBJECT, backend).is_unknown());
        assert_eq!(object.sibling(OBJECT), object);
        assert_ne!(object.sibling(8), object);
    }

    #[test]
    fn object_properties() {
        let (backend, object) = object();
        backend.insert_scalar(OBJECT, PropertyAddress::global(selector::CLASS), class::DEVICE);
        backend.insert_scalar(OBJECT, PropertyAddress::global(selector::BASE_CLASS), class::OBJECT);
        backend.insert_scalar(OBJECT, PropertyAddress::global(selector::OWNER), 1u32);
        backend.insert_string(OBJECT, PropertyAddress::global(selector::NAME), "Interface");
        backend.insert_string(OBJECT, PropertyAddress::global(selector::MANUFACTURER), "Acme");
        backend.insert_string(
            OBJECT,
            PropertyAddress::new(selector::ELEMENT_NAME, scope::OUTPUT, 3),
            "Main L",
        );
        backend.insert_array(OBJECT, PropertyAddress::global(selector::OWNED_OBJECTS), &[8u32, 9]);

        assert_eq!(object.class(), Ok(class::DEVICE));
        assert_eq!(object.base_class(), Ok(class::OBJECT));
        assert_eq!(object.owner(), Ok(1));
        assert_eq!(object.name().as_deref(), Ok("Interface"));
        assert_eq!(object.manufacturer().as_deref(), Ok("Acme"));
        assert_eq!(object.element_name(scope::OUTPUT, 3).as_deref(), Ok("Main L"));
        assert_eq!(object.owned_objects(), Ok(vec![8, 9]));
        assert!(object.model_name().is_err());
        assert!(object.has_property(&PropertyAddress::global(selector::NAME)));
    }

    #[test]
    fn size_checks() {
        let (backend, object) = object();
        let address = PropertyAddress::global(selector::OWNER);
        backend.insert_data(OBJECT, address, vec![0; 6], false);
        assert_eq!(
            object.scalar_property::<u32>(&address),
            Err(AudioObjectError::BadPropertySize {
                property: address.to_string(),
                expected: 4,
                actual: 6
            })
        );
        assert!(object.array_property::<u32>(&address).is_err());
        assert_eq!(object.array_property::<u16>(&address), Ok(vec![0, 0, 0]));
    }

    #[test]
    fn formats_and_ranges() {
        let (backend, object) = object();
        let format = StreamDescription::from_common_format(CommonPcmFormat::Int16, 48000.0, 2, true);
        let address = PropertyAddress::global(selector::VIRTUAL_FORMAT);
        backend.insert_format(OBJECT, address, &format, true);
        assert_eq!(object.stream_description_property(&address), Ok(format));

        let float = format.standard_equivalent().unwrap();
        object.set_stream_description_property(&address, &float).unwrap();
        assert_eq!(object.stream_description_property(&address), Ok(float));

        let rates = PropertyAddress::global(selector::AVAILABLE_NOMINAL_SAMPLE_RATES);
        let mut data = ValueRange::new(44100.0, 44100.0).to_ne_bytes().to_vec();
        data.extend_from_slice(&ValueRange::new(8000.0, 192000.0).to_ne_bytes());
        backend.insert_data(OBJECT, rates, data, false);
        let ranges = object.value_ranges_property(&rates).unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(ranges[1].contains(96000.0));
    }

    #[test]
    fn listener_through_object() {
        let (backend, object) = object();
        let size = PropertyAddress::global(selector::BUFFER_FRAME_SIZE);
        backend.insert_settable_scalar(OBJECT, size, 512u32);

        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);
        let watcher = object.clone();
        let token = object
            .add_property_listener(&size, move |_, addresses: &[PropertyAddress]| {
                if let Ok(v) = watcher.scalar_property::<u32>(&addresses[0]) {
                    sink.store(v, Ordering::SeqCst);
                }
            })
            .unwrap();

        assert_eq!(object.is_settable(&size), Ok(true));
        object.set_scalar_property(&size, 1024u32).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1024);
        object.remove_property_listener(token).unwrap();
    }
}
