//! Terminal commands of the client prompt.
//!
//! ```text
//! on [color] [ms]      TORCH_ON
//! off                  TORCH_OFF
//! pulse [color]        PULSE
//! strobe [hz] [ms]     STROBE
//! wave <color> [ms]    COLOR_WAVE
//! status               local clock / output status
//! ```

use thiserror::Error;

use flashcrowd_shared::protocol::{EffectDescriptor, EffectType};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Compose and dispatch an effect (hosts only)
    Effect(EffectDescriptor),
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("invalid {what} '{value}'")]
    InvalidArgument { what: &'static str, value: String },

    #[error("missing {0}")]
    MissingArgument(&'static str),
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(Command::Help);
    };
    let args: Vec<&str> = words.collect();

    let effect = match name.to_ascii_lowercase().as_str() {
        "status" => return Ok(Command::Status),
        "help" | "?" => return Ok(Command::Help),
        "on" => {
            let mut effect = EffectDescriptor::new(EffectType::TorchOn);
            if let Some(color) = args.first() {
                effect = effect.with_color(*color);
            }
            if let Some(ms) = args.get(1) {
                effect = effect.with_duration(parse_ms(ms)?);
            }
            effect
        }
        "off" => EffectDescriptor::new(EffectType::TorchOff),
        "pulse" => {
            let effect = EffectDescriptor::new(EffectType::Pulse);
            match args.first() {
                Some(color) => effect.with_color(*color),
                None => effect,
            }
        }
        "strobe" => {
            let mut effect = EffectDescriptor::new(EffectType::Strobe);
            if let Some(hz) = args.first() {
                let frequency = hz.parse::<f64>().map_err(|_| CommandError::InvalidArgument {
                    what: "frequency",
                    value: hz.to_string(),
                })?;
                effect = effect.with_frequency(frequency);
            }
            if let Some(ms) = args.get(1) {
                effect = effect.with_duration(parse_ms(ms)?);
            }
            effect
        }
        "wave" => {
            let color = args.first().ok_or(CommandError::MissingArgument("color"))?;
            let mut effect = EffectDescriptor::new(EffectType::ColorWave).with_color(*color);
            if let Some(ms) = args.get(1) {
                effect = effect.with_duration(parse_ms(ms)?);
            }
            effect
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Command::Effect(effect))
}

fn parse_ms(value: &str) -> Result<u64, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        what: "duration",
        value: value.to_string(),
    })
}
