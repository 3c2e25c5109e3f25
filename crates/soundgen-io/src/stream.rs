//! Real-time audio output via cpal.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default channel count.
    pub channels: u16,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

impl AudioDevice {
    fn describe(device: &Device, is_default: bool) -> Option<Self> {
        let name = device_name(device).ok()?;
        let (channels, default_sample_rate) = device
            .default_output_config()
            .map(|c| (c.channels(), c.sample_rate()))
            .unwrap_or((2, 48000));
        Some(Self {
            name,
            channels,
            default_sample_rate,
            is_default,
        })
    }
}

/// List all available output devices.
pub fn list_output_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            let is_default = device_name(&device).ok() == default_name;
            if let Some(info) = AudioDevice::describe(&device, is_default) {
                devices.push(info);
            }
        }
    }
    Ok(devices)
}

/// Get the default output device info, if the host has one.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host
        .default_output_device()
        .and_then(|d| AudioDevice::describe(&d, true)))
}

/// Output-only audio stream.
pub struct AudioStream {
    device: Device,
    running: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
    stream: Option<Stream>,
}

impl AudioStream {
    /// Open `output_device` (name, partial name or index), or the default.
    pub fn new(output_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match output_device {
            Some(name) => {
                let devices: Vec<_> = host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?
                    .collect();
                find_device_from_list(&devices, name)?
            }
            None => host.default_output_device().ok_or(Error::NoDevice)?,
        };

        Ok(Self {
            device,
            running: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
            stream: None,
        })
    }

    /// Name of the opened device.
    pub fn device_name(&self) -> String {
        device_name(&self.device).unwrap_or_else(|_| "<unknown>".to_string())
    }

    /// Device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.device
            .default_output_config()
            .map(|c| c.sample_rate())
            .unwrap_or(48000)
    }

    /// Device channel count.
    pub fn channels(&self) -> u16 {
        self.device
            .default_output_config()
            .map(|c| c.channels())
            .unwrap_or(2)
    }

    /// Start the stream and return immediately.
    ///
    /// `generate` is called from the audio thread with an interleaved
    /// buffer to fill.
    pub fn start_output<F>(&mut self, mut generate: F) -> Result<()>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let output_config = self
            .device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        if output_config.sample_format() != SampleFormat::F32 {
            return Err(Error::UnsupportedFormat(format!(
                "{:?}",
                output_config.sample_format()
            )));
        }

        self.running.store(true, Ordering::SeqCst);
        let output_running = Arc::clone(&self.running);
        let errors = Arc::clone(&self.error_count);
        let stream = self
            .device
            .build_output_stream(
                &output_config.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if output_running.load(Ordering::SeqCst) {
                        generate(data);
                    } else {
                        data.fill(0.0);
                    }
                },
                move |err| {
                    errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(%err, "output stream error");
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = %self.device_name(),
            sample_rate = output_config.sample_rate(),
            channels = output_config.channels(),
            "output stream started"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Start the stream and block until [`AudioStream::stop`] is called
    /// through the [`running`](AudioStream::running) flag.
    pub fn run_output<F>(&mut self, generate: F) -> Result<()>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        self.start_output(generate)?;
        while self.running.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        Ok(())
    }

    /// Stop the audio stream.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the stream is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared running flag, for stopping from another thread.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Cumulative count of stream errors reported by the host.
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }
}

/// Find a device from a list by index, exact name, or fuzzy match.
fn find_device_from_list(devices: &[Device], name_or_index: &str) -> Result<Device> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "output device index {} (only {} devices available)",
                index,
                devices.len()
            ))
        });
    }

    if let Some(device) = devices
        .iter()
        .find(|d| device_name(d).is_ok_and(|n| n == name_or_index))
    {
        return Ok(device.clone());
    }

    let search_lower = name_or_index.to_lowercase();
    let mut matches: Vec<_> = devices
        .iter()
        .filter_map(|d| {
            device_name(d)
                .ok()
                .filter(|name| name.to_lowercase().contains(&search_lower))
                .map(|name| (d.clone(), name))
        })
        .collect();

    match matches.len() {
        0 => Err(Error::DeviceNotFound(format!(
            "no output device matching '{name_or_index}'"
        ))),
        1 => Ok(matches.remove(0).0),
        _ => {
            let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(
                search = name_or_index,
                ?names,
                "several output devices match, using the first"
            );
            Ok(matches.remove(0).0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_output_devices() {
        // Device availability depends on the system; this only checks the
        // enumeration itself succeeds.
        let result = list_output_devices();
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_output_device() {
        let result = default_output_device();
        assert!(result.is_ok());
    }

    #[test]
    fn empty_list_reports_not_found() {
        assert!(matches!(
            find_device_from_list(&[], "3"),
            Err(Error::DeviceNotFound(msg)) if msg.contains("only 0")
        ));
        assert!(matches!(
            find_device_from_list(&[], "speakers"),
            Err(Error::DeviceNotFound(_))
        ));
    }
}
