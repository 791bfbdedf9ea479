use std::ops::Deref;

use crate::format::stream_description::{StreamDescription, StreamRangedDescription};
use crate::object::audio_object::AudioObject;
use crate::object::backend::PropertyBackend;
use crate::object::property_address::{DirectionalScope, PropertyAddress, selector};
use crate::utils::errors::AudioObjectError;

/// An audio stream object owned by a device.
pub struct AudioStream<B: PropertyBackend + ?Sized> {
    object: AudioObject<B>,
}

impl<B: PropertyBackend + ?Sized> Clone for AudioStream<B> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
        }
    }
}

impl<B: PropertyBackend + ?Sized> std::fmt::Debug for AudioStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AudioStream").field(&self.id()).finish()
    }
}

impl<B: PropertyBackend + ?Sized> Deref for AudioStream<B> {
    type Target = AudioObject<B>;

    fn deref(&self) -> &Self::Target {
        &self.object
    }
}

impl<B: PropertyBackend + ?Sized> From<AudioObject<B>> for AudioStream<B> {
    fn from(object: AudioObject<B>) -> Self {
        Self { object }
    }
}

impl<B: PropertyBackend + ?Sized> AudioStream<B> {
    pub fn is_active(&self) -> Result<bool, AudioObjectError> {
        self.bool_property(&PropertyAddress::global(selector::IS_ACTIVE))
    }

    pub fn direction(&self) -> Result<DirectionalScope, AudioObjectError> {
        let direction: u32 = self.scalar_property(&PropertyAddress::global(selector::DIRECTION))?;
        Ok(if direction == 0 {
            DirectionalScope::Output
        } else {
            DirectionalScope::Input
        })
    }

    pub fn terminal_type(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::TERMINAL_TYPE))
    }

    /// First device channel (1-based) carried by the stream.
    pub fn starting_channel(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::STARTING_CHANNEL))
    }

    pub fn latency(&self) -> Result<u32, AudioObjectError> {
        self.scalar_property(&PropertyAddress::global(selector::LATENCY))
    }

    pub fn virtual_format(&self) -> Result<StreamDescription, AudioObjectError> {
        self.stream_description_property(&PropertyAddress::global(selector::VIRTUAL_FORMAT))
    }

    pub fn set_virtual_format(&self, format: &StreamDescription) -> Result<(), AudioObjectError> {
        self.set_stream_description_property(
            &PropertyAddress::global(selector::VIRTUAL_FORMAT),
            format,
        )
    }

    pub fn physical_format(&self) -> Result<StreamDescription, AudioObjectError> {
        self.stream_description_property(&PropertyAddress::global(selector::PHYSICAL_FORMAT))
    }

    pub fn set_physical_format(&self, format: &StreamDescription) -> Result<(), AudioObjectError> {
        self.set_stream_description_property(
            &PropertyAddress::global(selector::PHYSICAL_FORMAT),
            format,
        )
    }

    pub fn available_virtual_formats(
        &self,
    ) -> Result<Vec<StreamRangedDescription>, AudioObjectError> {
        self.ranged_descriptions_property(&PropertyAddress::global(
            selector::AVAILABLE_VIRTUAL_FORMATS,
        ))
    }

    pub fn available_physical_formats(
        &self,
    ) -> Result<Vec<StreamRangedDescription>, AudioObjectError> {
        self.ranged_descriptions_property(&PropertyAddress::global(
            selector::AVAILABLE_PHYSICAL_FORMATS,
        ))
    }
}
