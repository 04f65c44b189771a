//! Alarm sound playback.

use std::{fmt, fs::File, io::BufReader, path::PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{AlarmError, Result};

/// Plays the alarm sound until told to stop.
pub trait Ringer {
    /// Starts looping the sound, does nothing if it's already ringing.
    ///
    /// # Errors
    /// If the sound couldn't be opened or played.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_ringing(&self) -> bool;
}

/// Rings through the default audio output.
pub struct RodioRinger {
    // has to outlive the sink
    stream: OutputStream,
    sink: Option<Sink>,
    sound: PathBuf,
    volume: f32,
}

impl fmt::Debug for RodioRinger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RodioRinger")
            .field("sound", &self.sound)
            .field("volume", &self.volume)
            .field("ringing", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl RodioRinger {
    /// `volume` is a fraction, 1.0 being full volume.
    ///
    /// # Errors
    /// If there is no usable audio output.
    pub fn open(sound: PathBuf, volume: f32) -> Result<Self> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AlarmError::Audio(format!("couldn't open audio output: {e}")))?;
        Ok(Self {
            stream,
            sink: None,
            sound,
            volume,
        })
    }
}

impl Ringer for RodioRinger {
    fn start(&mut self) -> Result<()> {
        if self.is_ringing() {
            return Ok(());
        }
        let file = File::open(&self.sound).map_err(|e| {
            AlarmError::Audio(format!("couldn't open sound file {}: {e}", self.sound.display()))
        })?;
        // create source that repeatedly plays the sound at the configured volume and play it
        let input = Decoder::new(BufReader::new(file))
            .map_err(|e| AlarmError::Audio(format!("couldn't decode {}: {e}", self.sound.display())))?
            .repeat_infinite();
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.append(input);
        sink.play();
        self.sink = Some(sink);
        log::debug!("ringing {}", self.sound.display());
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            log::debug!("stopped ringing");
        }
    }

    fn is_ringing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}

/// Used when there is no sound to play, only tracks whether it would be ringing.
#[derive(Debug, Default)]
pub struct SilentRinger {
    ringing: bool,
}

impl Ringer for SilentRinger {
    fn start(&mut self) -> Result<()> {
        self.ringing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.ringing = false;
    }

    fn is_ringing(&self) -> bool {
        self.ringing
    }
}
