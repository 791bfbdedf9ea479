use std::ops::Deref;

use log::debug;

use crate::format::stream_description::ValueRange;
use crate::object::audio_object::AudioObject;
use crate::object::backend::PropertyBackend;
use crate::object::property_address::{
    DirectionalScope, ObjectId, PropertyAddress, TransportType, selector,
};
use crate::object::stream::AudioStream;
use crate::utils::errors::AudioObjectError;

/// An audio device object.
pub struct AudioDevice<B: PropertyBackend + ?Sized> {
    object: AudioObject<B>,
}

impl<B: PropertyBackend + ?Sized> Clone for AudioDevice<B> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
        }
    }
}

impl<B: PropertyBackend + ?Sized> std::fmt::Debug for AudioDevice<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AudioDevice").field(&self.id()).finish()
    }
}

impl<B: PropertyBackend + ?Sized> PartialEq for AudioDevice<B> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl<B: PropertyBackend + ?Sized> Deref for AudioDevice<B> {
    type Target = AudioObject<B>;

    fn deref(&self) -> &Self::Target {
        &self.object
    }
}

impl<B: PropertyBackend + ?Sized> From<AudioObject<B>> for AudioDevice<B> {
    fn from(object: AudioObject<B>) -> Self {
        Self { object }
    }
}

impl<B: PropertyBackend + ?Sized> AudioDevice<B> {
    pub fn uid(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::DEVICE_UID))
    }

    pub fn model_uid(&self) -> Result<String, AudioObjectError> {
        self.string_property(&PropertyAddress::global(selector::MODEL_UID))
    }

    /// Presentation latency in frames.
    pub fn latency(&self, scope: DirectionalScope) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::scoped(selector::LATENCY, scope.scope()))
    }

    pub fn safety_offset(&self, scope: DirectionalScope) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::scoped(selector::SAFETY_OFFSET, scope.scope()))
    }

    pub fn stream_ids(&self, scope: DirectionalScope) -> Result<Vec<ObjectId>, AudioObjectError> {
        self.array_property(&PropertyAddress::scoped(selector::STREAMS, scope.scope()))
    }

    pub fn streams(&self, scope: DirectionalScope) -> Result<Vec<AudioStream<B>>, AudioObjectError> {
        Ok(self
            .stream_ids(scope)?
            .into_iter()
            .map(|id| AudioStream::from(self.sibling(id)))
            .collect())
    }

    pub fn nominal_sample_rate(&self) -> Result<f64, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::NOMINAL_SAMPLE_RATE))
    }

    pub fn set_nominal_sample_rate(&self, sample_rate: f64) -> Result<(), AudioObjectError> {
        debug!("Setting nominal sample rate of device {} to {sample_rate}", self.id());
        self.set_scalar_property(
            &PropertyAddress::global(selector::NOMINAL_SAMPLE_RATE),
            sample_rate,
        )
    }

    pub fn available_nominal_sample_rates(&self) -> Result<Vec<ValueRange>, AudioObjectError> {
        self.value_ranges_property(&PropertyAddress::global(
            selector::AVAILABLE_NOMINAL_SAMPLE_RATES,
        ))
    }

    pub fn buffer_frame_size(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::BUFFER_FRAME_SIZE))
    }

    pub fn set_buffer_frame_size(&self, frames: u32) -> Result<(), AudioObjectError> {
        debug!("Setting buffer frame size of device {} to {frames}", self.id());
        self.set_scalar_property(&PropertyAddress::global(selector::BUFFER_FRAME_SIZE), frames)
    }

    pub fn is_alive(&self) -> Result<bool, AudioObjectError> {
        self.bool_property(&PropertyAddress::global(selector::DEVICE_IS_ALIVE))
    }

    pub fn is_running(&self) -> Result<bool, AudioObjectError> {
        self.bool_property(&PropertyAddress::global(selector::DEVICE_IS_RUNNING))
    }

    pub fn transport_type(&self) -> Result<TransportType, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::TRANSPORT_TYPE))
            .map(TransportType)
    }

    /// Channel numbers (1-based) used for stereo output.
    pub fn preferred_channels_for_stereo(&self) -> Result<(u32, u32), AudioObjectError> {
        let address = PropertyAddress::scoped(
            selector::PREFERRED_CHANNELS_FOR_STEREO,
            DirectionalScope::Output.scope(),
        );
        let channels = self.array_property::<u32>(&address)?;
        match channels[..] {
            [left, right] => Ok((left, right)),
            _ => Err(AudioObjectError::BadPropertySize {
                property: address.to_string(),
                expected: 8,
                actual: channels.len() * 4,
            }),
        }
    }
}
