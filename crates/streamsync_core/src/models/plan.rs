//! Remux plan produced by the correction planner.

use serde::{Deserialize, Serialize};

use super::enums::{CodecMode, RemuxOperation, TrackKind};

/// Timing adjustment applied to one decoded instance of the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seconds", rename_all = "snake_case")]
pub enum InputShift {
    /// Read unmodified from time 0.
    None,
    /// Timestamps pushed later by the given seconds.
    Delay(f64),
    /// Reading starts this many seconds into the source.
    Seek(f64),
}

impl InputShift {
    /// Shift magnitude in seconds (0 for `None`).
    pub fn seconds(&self) -> f64 {
        match self {
            InputShift::None => 0.0,
            InputShift::Delay(s) | InputShift::Seek(s) => *s,
        }
    }
}

/// One logical read of the input file and the track it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputInstance {
    /// Position of this instance among the engine inputs.
    pub index: usize,
    /// Track taken from this instance.
    pub supplies: TrackKind,
    pub shift: InputShift,
}

impl InputInstance {
    pub fn new(index: usize, supplies: TrackKind, shift: InputShift) -> Self {
        Self {
            index,
            supplies,
            shift,
        }
    }
}

/// Immutable description of one correction remux.
///
/// Two instances of the same input are combined: one supplies the video,
/// the other the audio. The primary instance is mapped first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemuxPlan {
    pub operation: RemuxOperation,
    pub primary: InputInstance,
    pub secondary: InputInstance,
    pub video_codec: CodecMode,
    pub audio_codec: CodecMode,
}

impl RemuxPlan {
    /// Instances in mapping order.
    pub fn instances(&self) -> [&InputInstance; 2] {
        [&self.primary, &self.secondary]
    }

    /// Instance supplying the given track.
    pub fn instance_for(&self, kind: TrackKind) -> &InputInstance {
        if self.primary.supplies == kind {
            &self.primary
        } else {
            &self.secondary
        }
    }

    /// Time shift applied to the audio, in seconds.
    pub fn shift_seconds(&self) -> f64 {
        self.instance_for(TrackKind::Audio).shift.seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> RemuxPlan {
        RemuxPlan {
            operation: RemuxOperation::DelayAudio,
            primary: InputInstance::new(0, TrackKind::Video, InputShift::None),
            secondary: InputInstance::new(1, TrackKind::Audio, InputShift::Delay(0.5)),
            video_codec: CodecMode::Passthrough,
            audio_codec: CodecMode::Reencode("aac".to_string()),
        }
    }

    #[test]
    fn finds_instance_by_track() {
        let plan = sample_plan();
        assert_eq!(plan.instance_for(TrackKind::Video).index, 0);
        assert_eq!(plan.instance_for(TrackKind::Audio).index, 1);
        assert!((plan.shift_seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn plan_serializes() {
        let json = serde_json::to_string(&sample_plan()).unwrap();
        assert!(json.contains("\"operation\":\"DelayAudio\""));
        assert!(json.contains("\"kind\":\"delay\""));
    }
}
