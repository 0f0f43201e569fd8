//! Gesture scripts and their deterministic replay.
//!
//! A script is a JSON list of timed input steps. Replay feeds them to an
//! [`EngineCore`] in order and, between steps, drives animation frames on a
//! fixed clock for as long as the engine asks for them.

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use serde::{Deserialize, Serialize};
use stickyboard::config::{BoardSettings, EngineConfig};
use stickyboard::engine::{Action, EngineCore};
use stickyboard::geometry::{Point, Size, ViewportTransform};
use stickyboard::hit::TargetInfo;
use stickyboard::input::{Button, Device, Focus, Key, Modifiers, WheelDelta};
use tracing::{debug, warn};

const DEFAULT_FRAME_MS: f64 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("frame interval must be a positive number of milliseconds, got {0}")]
    FrameInterval(f64),
    #[error("step {index} at {at}ms comes before the previous step at {previous}ms")]
    OutOfOrder { index: usize, at: f64, previous: f64 },
}

/// One input step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    PointerDown {
        device: Device,
        #[serde(default)]
        button: Button,
        contacts: Vec<Point>,
        #[serde(default)]
        target: TargetInfo,
    },
    PointerMove {
        device: Device,
        contacts: Vec<Point>,
    },
    PointerUp {
        device: Device,
        #[serde(default)]
        remaining: Vec<Point>,
    },
    Cancel,
    TouchEnd,
    Wheel {
        pointer: Point,
        delta: WheelDelta,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Key {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        focus: Focus,
    },
    ZoomIn,
    ZoomOut,
    Reset,
    Minimap {
        click: Point,
    },
    Resize {
        width: f64,
        height: f64,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::PointerDown { .. } => "pointer_down",
            Self::PointerMove { .. } => "pointer_move",
            Self::PointerUp { .. } => "pointer_up",
            Self::Cancel => "cancel",
            Self::TouchEnd => "touch_end",
            Self::Wheel { .. } => "wheel",
            Self::Key { .. } => "key",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::Reset => "reset",
            Self::Minimap { .. } => "minimap",
            Self::Resize { .. } => "resize",
        }
    }
}

/// A step and the time it happens, in ms from the start of the script.
#[derive(Debug, Clone, Deserialize)]
pub struct TimedStep {
    pub at: f64,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Board size; defaults to 1280x800.
    #[serde(default = "default_viewport")]
    pub viewport: Size,
    #[serde(default)]
    pub settings: BoardSettings,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    pub steps: Vec<TimedStep>,
}

fn default_viewport() -> Size {
    Size::new(1280.0, 800.0)
}

fn default_frame_ms() -> f64 {
    DEFAULT_FRAME_MS
}

/// Actions produced at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub at: f64,
    pub source: &'static str,
    pub actions: Vec<Action>,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Replay {
    pub records: Vec<Record>,
    /// Frames driven, including those that produced no actions.
    pub frames: u64,
    /// Whether the engine still wanted frames when replay stopped.
    pub unsettled: bool,
    pub transform: ViewportTransform,
}

struct Replayer {
    core: EngineCore,
    frame_ms: f64,
    next_frame: f64,
    frames: u64,
    records: Vec<Record>,
}

impl Replayer {
    fn record(&mut self, at: f64, source: &'static str, actions: Vec<Action>) {
        if source == "frame" && actions.is_empty() {
            return;
        }
        self.records.push(Record { at, source, actions });
    }

    /// Drive frames up to and including `until`, at most `budget` of them.
    fn run_frames(&mut self, until: f64, budget: u64) {
        let mut spent = 0;
        while self.core.needs_frame() && self.next_frame <= until && spent < budget {
            let now = self.next_frame;
            let actions = self.core.on_frame(now);
            self.record(now, "frame", actions);
            self.next_frame += self.frame_ms;
            self.frames += 1;
            spent += 1;
        }
    }

    fn apply(&mut self, at: f64, step: &Step) {
        let core = &mut self.core;
        let actions = match step {
            Step::PointerDown { device, button, contacts, target } => {
                core.on_pointer_down(*device, *button, contacts, target, at)
            }
            Step::PointerMove { device, contacts } => core.on_pointer_move(*device, contacts, at),
            Step::PointerUp { device, remaining } => core.on_pointer_up(*device, remaining, at),
            Step::Cancel => core.on_pointer_cancel(at),
            Step::TouchEnd => core.on_touch_end(at),
            Step::Wheel { pointer, delta, modifiers } => core.on_wheel(*pointer, *delta, *modifiers),
            Step::Key { key, modifiers, focus } => core.on_key_down(key, *modifiers, *focus),
            Step::ZoomIn => core.zoom_in(),
            Step::ZoomOut => core.zoom_out(),
            Step::Reset => core.reset(),
            Step::Minimap { click } => core.navigate_minimap(*click),
            Step::Resize { width, height } => {
                core.set_viewport(*width, *height);
                Vec::new()
            }
        };
        self.record(at, step.name(), actions);
        if self.next_frame <= at {
            self.next_frame = at + self.frame_ms;
        }
    }
}

/// Replay `script` against a fresh engine.
///
/// After the last step, frames keep running until the engine settles or
/// `settle_frames` frames have been driven.
///
/// # Errors
///
/// Returns [`ScriptError`] for a non-positive frame interval or steps that go
/// back in time.
pub fn replay(script: &Script, config: EngineConfig, settle_frames: u64) -> Result<Replay, ScriptError> {
    if !script.frame_ms.is_finite() || script.frame_ms <= 0.0 {
        return Err(ScriptError::FrameInterval(script.frame_ms));
    }
    let mut core = EngineCore::new(config, script.settings.clone());
    core.set_viewport(script.viewport.width, script.viewport.height);
    let mut replayer =
        Replayer { core, frame_ms: script.frame_ms, next_frame: script.frame_ms, frames: 0, records: Vec::new() };

    let mut previous = 0.0;
    for (index, timed) in script.steps.iter().enumerate() {
        if timed.at.is_nan() || timed.at < previous {
            return Err(ScriptError::OutOfOrder { index, at: timed.at, previous });
        }
        replayer.run_frames(timed.at, u64::MAX);
        debug!(index, at = timed.at, step = timed.step.name(), "replay: step");
        replayer.apply(timed.at, &timed.step);
        previous = timed.at;
    }
    replayer.run_frames(f64::INFINITY, settle_frames);

    let unsettled = replayer.core.needs_frame();
    if unsettled {
        warn!(frames = replayer.frames, "replay: engine still animating after settle budget");
    }
    Ok(Replay {
        records: replayer.records,
        frames: replayer.frames,
        unsettled,
        transform: replayer.core.transform(),
    })
}
