//! Light output: device torch with a screen-flash fallback.
//!
//! The torch is only used when it exists and permission was granted. When the
//! torch is missing, denied, or a toggle fails, the screen flashes the effect
//! colour instead (white by default).

use std::fmt;

use crate::formatter::MessageFormatter;

pub const DEFAULT_FLASH_COLOR: &str = "#FFFFFF";

/// Device torch contract
pub trait Torch: Send + Sync {
    /// Ask for permission to use the torch; `false` when denied or unavailable
    fn request_permission(&self) -> bool;

    /// Switch the torch, returning whether the device accepted the change
    fn toggle(&self, on: bool) -> bool;
}

/// Full-screen flash contract
pub trait Screen: Send + Sync {
    /// Fill the screen with `color`, or clear it with `None`
    fn flash(&self, color: Option<&str>);
}

/// What the device can actually light up, surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Torch,
    ScreenOnly,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Torch => f.write_str("torch"),
            Capability::ScreenOnly => f.write_str("screen only"),
        }
    }
}

pub struct LightOutput {
    torch: Option<Box<dyn Torch>>,
    screen: Box<dyn Screen>,
    capability: Capability,
    lit: bool,
}

impl LightOutput {
    pub fn new(torch: Option<Box<dyn Torch>>, screen: Box<dyn Screen>) -> Self {
        let torch = torch.filter(|t| t.request_permission());
        let capability = if torch.is_some() {
            Capability::Torch
        } else {
            tracing::info!("Torch unavailable, using screen flash");
            Capability::ScreenOnly
        };
        Self {
            torch,
            screen,
            capability,
            lit: false,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Turn the light on (with an optional colour) or off.
    ///
    /// Turning off an output that is already off does nothing.
    pub fn set(&mut self, on: bool, color: Option<&str>) {
        if !on && !self.lit {
            return;
        }

        if let Some(torch) = &self.torch {
            if torch.toggle(on) {
                self.lit = on;
                return;
            }
            tracing::warn!("Torch toggle failed, falling back to screen flash");
            self.torch = None;
            self.capability = Capability::ScreenOnly;
        }

        let color = on.then(|| color.unwrap_or(DEFAULT_FLASH_COLOR));
        self.screen.flash(color);
        self.lit = on;
    }
}

/// Torch stand-in for terminals: prints the transitions
pub struct ConsoleTorch;

impl Torch for ConsoleTorch {
    fn request_permission(&self) -> bool {
        true
    }

    fn toggle(&self, on: bool) -> bool {
        println!("{}", MessageFormatter::format_torch(on));
        true
    }
}

/// Screen stand-in for terminals
pub struct ConsoleScreen;

impl Screen for ConsoleScreen {
    fn flash(&self, color: Option<&str>) {
        println!("{}", MessageFormatter::format_screen(color));
    }
}
