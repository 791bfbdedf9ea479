use anyhow::Result;
use serde::Serialize;

use coreaudio_ext::object::{AudioDevice, AudioSystemObject, DirectionalScope, PropertyBackend};

use super::command::{Cli, DevicesArgs};
use super::format::{FormatReport, yes_no};
use super::output::{Report, emit, field};

#[cfg(target_os = "macos")]
pub fn cmd_devices(args: &DevicesArgs, _cli: &Cli) -> Result<()> {
    use std::sync::Arc;

    use coreaudio_ext::object::HalBackend;

    let system = AudioSystemObject::new(Arc::new(HalBackend::new()));
    emit(&DevicesReport::collect(&system)?, args.output)
}

#[cfg(not(target_os = "macos"))]
pub fn cmd_devices(_args: &DevicesArgs, _cli: &Cli) -> Result<()> {
    anyhow::bail!("Device enumeration requires the Core Audio HAL (macOS only)")
}

#[derive(Debug, Serialize)]
struct DevicesReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    default_input: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_output: Option<u32>,
    devices: Vec<DeviceReport>,
}

#[derive(Debug, Serialize)]
struct DeviceReport {
    id: u32,
    name: Option<String>,
    uid: Option<String>,
    manufacturer: Option<String>,
    transport: Option<String>,
    nominal_sample_rate: Option<f64>,
    buffer_frame_size: Option<u32>,
    streams: Vec<StreamReport>,
}

#[derive(Debug, Serialize)]
struct StreamReport {
    id: u32,
    direction: String,
    starting_channel: Option<u32>,
    virtual_format: Option<FormatReport>,
}

/// Turns a failed property read into `None`; devices routinely omit some.
fn optional<T, E: std::fmt::Display>(what: &str, id: u32, result: Result<T, E>) -> Option<T> {
    result
        .map_err(|err| log::debug!("Object {id}: no {what} ({err})"))
        .ok()
}

impl DevicesReport {
    fn collect<B: PropertyBackend + ?Sized>(system: &AudioSystemObject<B>) -> Result<Self> {
        let default_input = system.default_input_device()?.map(|d| d.id());
        let default_output = system.default_output_device()?.map(|d| d.id());
        let devices = system
            .devices()?
            .iter()
            .map(DeviceReport::collect)
            .collect::<Vec<_>>();
        log::debug!("Found {} device(s)", devices.len());
        Ok(Self {
            default_input,
            default_output,
            devices,
        })
    }
}

impl DeviceReport {
    fn collect<B: PropertyBackend + ?Sized>(device: &AudioDevice<B>) -> Self {
        let id = device.id();
        let mut streams = Vec::new();
        for scope in [DirectionalScope::Input, DirectionalScope::Output] {
            let Some(scope_streams) = optional("streams", id, device.streams(scope)) else {
                continue;
            };
            streams.extend(scope_streams.iter().map(|stream| {
                let stream_id = stream.id();
                StreamReport {
                    id: stream_id,
                    direction: scope.to_string(),
                    starting_channel: optional("starting channel", stream_id, stream.starting_channel()),
                    virtual_format: optional("virtual format", stream_id, stream.virtual_format())
                        .as_ref()
                        .map(FormatReport::from),
                }
            }));
        }

        Self {
            id,
            name: optional("name", id, device.name()),
            uid: optional("uid", id, device.uid()),
            manufacturer: optional("manufacturer", id, device.manufacturer()),
            transport: optional("transport type", id, device.transport_type()).map(|t| t.to_string()),
            nominal_sample_rate: optional("sample rate", id, device.nominal_sample_rate()),
            buffer_frame_size: optional("buffer frame size", id, device.buffer_frame_size()),
            streams,
        }
    }
}

impl Report for DevicesReport {
    fn write_text(&self, out: &mut String) {
        if self.devices.is_empty() {
            out.push_str("No audio devices found.\n");
            return;
        }
        for device in &self.devices {
            let mut title = format!("Device {}", device.id);
            if self.default_input == Some(device.id) {
                title.push_str(" [default input]");
            }
            if self.default_output == Some(device.id) {
                title.push_str(" [default output]");
            }
            out.push_str(&title);
            out.push('\n');
            field(out, "  Name", device.name.as_deref().unwrap_or("unknown"));
            field(out, "  UID", device.uid.as_deref().unwrap_or("unknown"));
            field(
                out,
                "  Manufacturer",
                device.manufacturer.as_deref().unwrap_or("unknown"),
            );
            field(out, "  Transport", device.transport.as_deref().unwrap_or("unknown"));
            if let Some(rate) = device.nominal_sample_rate {
                field(out, "  Sample rate", format!("{rate} Hz"));
            }
            if let Some(frames) = device.buffer_frame_size {
                field(out, "  Buffer size", format!("{frames} frames"));
            }
            for stream in &device.streams {
                let format = stream
                    .virtual_format
                    .as_ref()
                    .map_or("unknown", |f| f.description.as_str());
                field(
                    out,
                    &format!("  {} stream {}", stream.direction, stream.id),
                    format,
                );
                if let Some(channel) = stream.starting_channel {
                    field(out, "    Starting channel", channel);
                }
                if let Some(format) = &stream.virtual_format {
                    field(out, "    Interleaved", yes_no(format.interleaved));
                }
            }
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use coreaudio_ext::format::{CommonPcmFormat, StreamDescription};
    use coreaudio_ext::object::property_address::{SYSTEM_OBJECT, UNKNOWN_OBJECT, scope, selector};
    use coreaudio_ext::object::{MemoryBackend, PropertyAddress};

    fn global(selector: u32) -> PropertyAddress {
        PropertyAddress::global(selector)
    }

    #[test]
    fn collects_simulated_devices() {
        let backend = MemoryBackend::new();
        backend.insert_array(SYSTEM_OBJECT, global(selector::DEVICES), &[7u32, 8]);
        backend.insert_scalar(SYSTEM_OBJECT, global(selector::DEFAULT_OUTPUT_DEVICE), 7u32);
        backend.insert_scalar(SYSTEM_OBJECT, global(selector::DEFAULT_INPUT_DEVICE), UNKNOWN_OBJECT);
        backend.insert_string(7, global(selector::NAME), "Headphones");
        backend.insert_scalar(7, global(selector::NOMINAL_SAMPLE_RATE), 48000.0f64);
        backend.insert_array(7, PropertyAddress::scoped(selector::STREAMS, scope::OUTPUT), &[70u32]);
        let format = StreamDescription::from_common_format(CommonPcmFormat::Float32, 48000.0, 2, true);
        backend.insert_format(70, global(selector::VIRTUAL_FORMAT), &format, false);
        backend.insert_string(8, global(selector::NAME), "Line In");

        let system = AudioSystemObject::new(Arc::new(backend));
        let report = DevicesReport::collect(&system).unwrap();
        assert_eq!(report.default_output, Some(7));
        assert_eq!(report.default_input, None);
        assert_eq!(report.devices.len(), 2);

        let headphones = &report.devices[0];
        assert_eq!(headphones.name.as_deref(), Some("Headphones"));
        assert_eq!(headphones.uid, None);
        assert_eq!(headphones.nominal_sample_rate, Some(48000.0));
        assert_eq!(headphones.streams.len(), 1);
        assert_eq!(headphones.streams[0].direction, "output");
        assert!(headphones.streams[0].virtual_format.is_some());
        assert!(report.devices[1].streams.is_empty());
    }
}
