//! Virtual matrix switch
//!
//! Models the routing state of a DigitalMedia switch and answers console
//! commands with protocol-accurate text.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dm_protocol::command::{INVALID_INPUT_MARKER, INVALID_OUTPUT_MARKER};
use dm_protocol::route_dump::{
    AUDIO_SOURCE_PREFIX, INPUT_SECTION_PREFIX, OUTPUT_SECTION_PREFIX, VIDEO_SOURCE_PREFIX,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;

/// First line of every routing dump
pub const DUMP_BANNER: &str = "DM Routing Information for all Output cards";

/// Reply to anything the simulator does not understand
pub const BAD_COMMAND_REPLY: &str = "Bad or Incomplete Command";

/// Configuration for creating a virtual switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualSwitchConfig {
    /// Console name, shown as the prompt
    pub name: String,
    /// Number of input cards, in slots `1..=inputs`
    pub inputs: u16,
    /// Number of output cards
    pub outputs: u16,
    /// Slot number of the first output card
    pub output_slot_start: i64,
    /// `setavuroute` index of the first output card
    pub set_route_output_start: i64,
    /// Time between a route acknowledgment and the route showing in a dump
    pub relay_latency_ms: u64,
}

impl Default for VirtualSwitchConfig {
    fn default() -> Self {
        Self {
            name: "DM-MD8X8".to_string(),
            inputs: 8,
            outputs: 8,
            output_slot_start: 33,
            set_route_output_start: 101,
            relay_latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct OutputCard {
    video: Option<u16>,
    audio: Option<u16>,
    pending: Option<(Option<u16>, Instant)>,
}

impl OutputCard {
    fn settle(&mut self, now: Instant) {
        if let Some((input, at)) = self.pending {
            if now >= at {
                self.video = input;
                self.audio = input;
                self.pending = None;
            }
        }
    }
}

/// A simulated switch
#[derive(Debug)]
pub struct VirtualSwitch {
    name: String,
    inputs: u16,
    output_slot_start: i64,
    set_route_output_start: i64,
    relay_latency: Duration,
    outputs: BTreeMap<i64, OutputCard>,
    dump_override: Option<String>,
    commands_seen: usize,
}

impl VirtualSwitch {
    /// Create a switch with the default 8x8 layout
    pub fn new() -> Self {
        Self::build(VirtualSwitchConfig::default())
    }

    /// Create a switch from configuration
    pub fn from_config(config: VirtualSwitchConfig) -> Result<Self, SimError> {
        if config.name.is_empty() || config.name.contains('>') {
            return Err(SimError::InvalidName(config.name));
        }
        if config.outputs == 0 {
            return Err(SimError::NoOutputs);
        }
        Ok(Self::build(config))
    }

    fn build(config: VirtualSwitchConfig) -> Self {
        let outputs = (0..i64::from(config.outputs))
            .map(|i| (config.output_slot_start + i, OutputCard::default()))
            .collect();

        Self {
            name: config.name,
            inputs: config.inputs,
            output_slot_start: config.output_slot_start,
            set_route_output_start: config.set_route_output_start,
            relay_latency: Duration::from_millis(config.relay_latency_ms),
            outputs,
            dump_override: None,
            commands_seen: 0,
        }
    }

    /// Console name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompt printed whenever the console is ready
    pub fn prompt(&self) -> String {
        format!("{}>", self.name)
    }

    /// Text printed when a session opens, before the first prompt
    pub fn banner(&self) -> String {
        format!("Crestron DigitalMedia Console\r\n{} ready\r\n", self.name)
    }

    /// Number of commands processed so far
    pub fn commands_seen(&self) -> usize {
        self.commands_seen
    }

    /// Replace the next dumps with fixed text, or restore real dumps
    pub fn override_dump(&mut self, text: Option<String>) {
        self.dump_override = text;
    }

    /// Set only the video source of an output, bypassing relay latency
    pub fn set_video_route(&mut self, output_slot: i64, input: Option<u16>) -> Result<(), SimError> {
        let card = self.card_mut(output_slot)?;
        card.video = input;
        Ok(())
    }

    /// Set only the audio source of an output, bypassing relay latency
    pub fn set_audio_route(&mut self, output_slot: i64, input: Option<u16>) -> Result<(), SimError> {
        let card = self.card_mut(output_slot)?;
        card.audio = input;
        Ok(())
    }

    /// Video and audio sources an output currently shows in a dump
    pub fn route(&mut self, output_slot: i64) -> Option<(Option<u16>, Option<u16>)> {
        let now = Instant::now();
        self.outputs.get_mut(&output_slot).map(|card| {
            card.settle(now);
            (card.video, card.audio)
        })
    }

    fn card_mut(&mut self, output_slot: i64) -> Result<&mut OutputCard, SimError> {
        self.outputs
            .get_mut(&output_slot)
            .ok_or(SimError::NoSuchOutput(output_slot))
    }

    /// Answer one console line (without its terminator)
    pub fn process_line(&mut self, line: &str) -> String {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return String::new();
        };
        self.commands_seen += 1;
        let args: Vec<&str> = words.collect();
        debug!("{} processing {:?}", self.name, line);

        match (keyword.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("dumpdmrouteinfo", []) => self.render_dump(),
            ("setavuroute", [input, index]) => self.set_avu_route(input, index),
            _ => BAD_COMMAND_REPLY.to_string(),
        }
    }

    fn set_avu_route(&mut self, input: &str, index: &str) -> String {
        let slot = index
            .parse::<i64>()
            .ok()
            .and_then(|i| i.checked_sub(self.set_route_output_start))
            .and_then(|i| i.checked_add(self.output_slot_start));
        let Some(slot) = slot.filter(|s| self.outputs.contains_key(s)) else {
            return format!("ERROR: {}", INVALID_OUTPUT_MARKER);
        };

        // input 0 clears the route
        let input = match input.parse::<u16>() {
            Ok(0) => None,
            Ok(n) if n <= self.inputs => Some(n),
            _ => return format!("ERROR: {}", INVALID_INPUT_MARKER),
        };

        let apply_at = Instant::now() + self.relay_latency;
        if let Some(card) = self.outputs.get_mut(&slot) {
            card.pending = Some((input, apply_at));
            card.settle(Instant::now());
        }
        debug!("{} routing {:?} to output {}", self.name, input, slot);
        String::new()
    }

    /// Render `dumpdmrouteinfo` output, ending with a blank line
    pub fn render_dump(&mut self) -> String {
        if let Some(text) = &self.dump_override {
            return text.clone();
        }

        let now = Instant::now();
        let mut lines = vec![DUMP_BANNER.to_string()];

        for input in 1..=self.inputs {
            lines.push(format!("{}{}", INPUT_SECTION_PREFIX, input));
            lines.push("Input Card Type: DMC-HD".to_string());
        }

        for (slot, card) in self.outputs.iter_mut() {
            card.settle(now);
            lines.push(format!("{}{}", OUTPUT_SECTION_PREFIX, slot));
            lines.push("Output Card Type: DMCO-11".to_string());
            if let Some(v) = card.video {
                lines.push(format!("{}{}", VIDEO_SOURCE_PREFIX, v));
            }
            if let Some(a) = card.audio {
                lines.push(format!("{}{}", AUDIO_SOURCE_PREFIX, a));
            }
        }

        lines.push(String::new());
        lines.join("\r\n")
    }
}

impl Default for VirtualSwitch {
    fn default() -> Self {
        Self::new()
    }
}
