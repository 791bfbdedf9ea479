use std::ops::Deref;
use std::sync::Arc;

use log::debug;

use crate::object::audio_object::AudioObject;
use crate::object::backend::PropertyBackend;
use crate::object::device::AudioDevice;
use crate::object::property_address::{
    ObjectId, PropertyAddress, SYSTEM_OBJECT, UNKNOWN_OBJECT, selector,
};
use crate::utils::errors::AudioObjectError;

/// The system object, root of the audio object tree.
pub struct AudioSystemObject<B: PropertyBackend + ?Sized> {
    object: AudioObject<B>,
}

impl<B: PropertyBackend + ?Sized> Deref for AudioSystemObject<B> {
    type Target = AudioObject<B>;

    fn deref(&self) -> &Self::Target {
        &self.object
    }
}

impl<B: PropertyBackend + ?Sized> AudioSystemObject<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            object: AudioObject::new(SYSTEM_OBJECT, backend),
        }
    }

    pub fn device_ids(&self) -> Result<Vec<ObjectId>, AudioObjectError> {
        self.array_property(&PropertyAddress::global(selector::DEVICES))
    }

    pub fn devices(&self) -> Result<Vec<AudioDevice<B>>, AudioObjectError> {
        Ok(self
            .device_ids()?
            .into_iter()
            .map(|id| AudioDevice::from(self.sibling(id)))
            .collect())
    }

    fn default_device(&self, which: u32) -> Result<Option<AudioDevice<B>>, AudioObjectError> {
        let id: ObjectId = self.scalar_property(&PropertyAddress::global(which))?;
        Ok((id != UNKNOWN_OBJECT).then(|| AudioDevice::from(self.sibling(id))))
    }

    pub fn default_input_device(&self) -> Result<Option<AudioDevice<B>>, AudioObjectError> {
        self.default_device(selector::DEFAULT_INPUT_DEVICE)
    }

    pub fn default_output_device(&self) -> Result<Option<AudioDevice<B>>, AudioObjectError> {
        self.default_device(selector::DEFAULT_OUTPUT_DEVICE)
    }

    pub fn default_system_output_device(
        &self,
    ) -> Result<Option<AudioDevice<B>>, AudioObjectError> {
        self.default_device(selector::DEFAULT_SYSTEM_OUTPUT_DEVICE)
    }

    /// Finds the device whose UID equals `uid`. Devices whose UID cannot be
    /// read are skipped.
    pub fn device_for_uid(&self, uid: &str) -> Result<AudioDevice<B>, AudioObjectError> {
        for device in self.devices()? {
            match device.uid() {
                Ok(device_uid) if device_uid == uid => return Ok(device),
                Ok(_) => {}
                Err(err) => debug!("Skipping device {}: {err}", device.id()),
            }
        }
        Err(AudioObjectError::NoDeviceForUid(uid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::stream_description::{
        CommonPcmFormat, StreamDescription, StreamRangedDescription, ValueRange,
    };
    use crate::object::backend::MemoryBackend;
    use crate::object::property_address::{DirectionalScope, TransportType, scope};

    const SPEAKERS: ObjectId = 40;
    const MICROPHONE: ObjectId = 41;
    const OUTPUT_STREAM: ObjectId = 50;

    fn global(selector: u32) -> PropertyAddress {
        PropertyAddress::global(selector)
    }

    fn simulated() -> AudioSystemObject<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.insert_array(SYSTEM_OBJECT, global(selector::DEVICES), &[SPEAKERS, MICROPHONE]);
        backend.insert_scalar(SYSTEM_OBJECT, global(selector::DEFAULT_OUTPUT_DEVICE), SPEAKERS);
        backend.insert_scalar(SYSTEM_OBJECT, global(selector::DEFAULT_INPUT_DEVICE), UNKNOWN_OBJECT);

        backend.insert_string(SPEAKERS, global(selector::NAME), "Speakers");
        backend.insert_string(SPEAKERS, global(selector::DEVICE_UID), "BuiltInSpeakerDevice");
        backend.insert_scalar(SPEAKERS, global(selector::TRANSPORT_TYPE), TransportType::BUILT_IN.0);
        backend.insert_settable_scalar(SPEAKERS, global(selector::NOMINAL_SAMPLE_RATE), 44100.0f64);
        backend.insert_settable_scalar(SPEAKERS, global(selector::BUFFER_FRAME_SIZE), 512u32);
        backend.insert_scalar(SPEAKERS, global(selector::DEVICE_IS_ALIVE), 1u32);
        backend.insert_scalar(SPEAKERS, global(selector::DEVICE_IS_RUNNING), 0u32);
        backend.insert_scalar(
            SPEAKERS,
            PropertyAddress::scoped(selector::LATENCY, scope::OUTPUT),
            24u32,
        );
        backend.insert_scalar(
            SPEAKERS,
            PropertyAddress::scoped(selector::SAFETY_OFFSET, scope::OUTPUT),
            16u32,
        );
        backend.insert_array(
            SPEAKERS,
            PropertyAddress::scoped(selector::STREAMS, scope::OUTPUT),
            &[OUTPUT_STREAM],
        );
        backend.insert_array(
            SPEAKERS,
            PropertyAddress::scoped(selector::PREFERRED_CHANNELS_FOR_STEREO, scope::OUTPUT),
            &[1u32, 2],
        );
        let mut rates = ValueRange::new(44100.0, 44100.0).to_ne_bytes().to_vec();
        rates.extend_from_slice(&ValueRange::new(48000.0, 48000.0).to_ne_bytes());
        backend.insert_data(SPEAKERS, global(selector::AVAILABLE_NOMINAL_SAMPLE_RATES), rates, false);

        let format = StreamDescription::from_common_format(CommonPcmFormat::Float32, 44100.0, 2, true);
        backend.insert_scalar(OUTPUT_STREAM, global(selector::IS_ACTIVE), 1u32);
        backend.insert_scalar(OUTPUT_STREAM, global(selector::DIRECTION), 0u32);
        backend.insert_scalar(OUTPUT_STREAM, global(selector::STARTING_CHANNEL), 1u32);
        backend.insert_format(OUTPUT_STREAM, global(selector::VIRTUAL_FORMAT), &format, true);
        let ranged = StreamRangedDescription {
            format,
            sample_rate_range: ValueRange::new(44100.0, 96000.0),
        };
        backend.insert_data(
            OUTPUT_STREAM,
            global(selector::AVAILABLE_VIRTUAL_FORMATS),
            ranged.to_ne_bytes(),
            false,
        );

        backend.insert_string(MICROPHONE, global(selector::NAME), "Microphone");

        AudioSystemObject::new(Arc::new(backend))
    }

    #[test]
    fn enumerates_devices() {
        let system = simulated();
        assert_eq!(system.id(), SYSTEM_OBJECT);
        assert_eq!(system.device_ids(), Ok(vec![SPEAKERS, MICROPHONE]));

        let names: Vec<String> = system
            .devices()
            .unwrap()
            .iter()
            .map(|d| d.name().unwrap())
            .collect();
        assert_eq!(names, ["Speakers", "Microphone"]);
    }

    #[test]
    fn default_devices() {
        let system = simulated();
        let output = system.default_output_device().unwrap().unwrap();
        assert_eq!(output.id(), SPEAKERS);
        assert!(system.default_input_device().unwrap().is_none());
        assert!(system.default_system_output_device().is_err());
    }

    #[test]
    fn lookup_by_uid() {
        let system = simulated();
        assert_eq!(system.device_for_uid("BuiltInSpeakerDevice").map(|d| d.id()), Ok(SPEAKERS));
        assert_eq!(
            system.device_for_uid("nope").map(|d| d.id()),
            Err(AudioObjectError::NoDeviceForUid("nope".to_string()))
        );
    }

    #[test]
    fn device_properties() {
        let system = simulated();
        let device = system.default_output_device().unwrap().unwrap();

        assert_eq!(device.uid().as_deref(), Ok("BuiltInSpeakerDevice"));
        assert_eq!(device.transport_type(), Ok(TransportType::BUILT_IN));
        assert_eq!(device.latency(DirectionalScope::Output), Ok(24));
        assert!(device.latency(DirectionalScope::Input).is_err());
        assert_eq!(device.safety_offset(DirectionalScope::Output), Ok(16));
        assert_eq!(device.is_alive(), Ok(true));
        assert_eq!(device.is_running(), Ok(false));
        assert_eq!(device.preferred_channels_for_stereo(), Ok((1, 2)));

        let rates = device.available_nominal_sample_rates().unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[1].minimum, 48000.0);

        device.set_nominal_sample_rate(48000.0).unwrap();
        assert_eq!(device.nominal_sample_rate(), Ok(48000.0));
        device.set_buffer_frame_size(256).unwrap();
        assert_eq!(device.buffer_frame_size(), Ok(256));
    }

    #[test]
    fn stream_properties() {
        let system = simulated();
        let device = system.default_output_device().unwrap().unwrap();
        let streams = device.streams(DirectionalScope::Output).unwrap();
        assert_eq!(streams.len(), 1);
        assert!(device.streams(DirectionalScope::Input).is_err());

        let stream = &streams[0];
        assert_eq!(stream.id(), OUTPUT_STREAM);
        assert_eq!(stream.is_active(), Ok(true));
        assert_eq!(stream.direction(), Ok(DirectionalScope::Output));
        assert_eq!(stream.starting_channel(), Ok(1));

        let format = stream.virtual_format().unwrap();
        assert!(format.is_float());
        assert_eq!(format.channel_count(), 2);

        let available = stream.available_virtual_formats().unwrap();
        assert_eq!(available.len(), 1);
        assert!(available[0].supports_sample_rate(48000.0));
        assert!(stream.available_physical_formats().is_err());

        let int16 = StreamDescription::from_common_format(CommonPcmFormat::Int16, 44100.0, 2, true);
        stream.set_virtual_format(&int16).unwrap();
        assert_eq!(stream.virtual_format(), Ok(int16));
    }
}
