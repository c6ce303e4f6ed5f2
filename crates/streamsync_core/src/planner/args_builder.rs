//! ffmpeg argument builder.
//!
//! Builds the argument list for the transcoding engine from a RemuxPlan.
//! Each instance becomes one `-i` input, preceded by its timing option:
//!
//! - **Delay**: `-itsoffset <s>` shifts the instance's timestamps later
//! - **Seek**: `-ss <s>` starts reading the instance `s` seconds in
//! - **None**: no timing option
//!
//! Streams are then selected with `-map <index>:v|a` in plan order and
//! codecs set per track (`copy` for passthrough).

use crate::models::{InputShift, RemuxPlan};

/// Builder for ffmpeg command-line arguments.
pub struct FfmpegArgsBuilder<'a> {
    plan: &'a RemuxPlan,
    input_name: &'a str,
    output_name: &'a str,
}

impl<'a> FfmpegArgsBuilder<'a> {
    /// Create a new builder reading `input_name` and writing `output_name`
    /// inside the engine's file area.
    pub fn new(plan: &'a RemuxPlan, input_name: &'a str, output_name: &'a str) -> Self {
        Self {
            plan,
            input_name,
            output_name,
        }
    }

    /// Build the complete argument list (without the program name).
    pub fn build(&self) -> Vec<String> {
        let mut args = Vec::new();

        self.add_inputs(&mut args);
        self.add_stream_maps(&mut args);
        self.add_codecs(&mut args);

        args.push(self.output_name.to_string());
        args
    }

    /// Add one `-i` per instance, in index order.
    fn add_inputs(&self, args: &mut Vec<String>) {
        let mut instances = self.plan.instances();
        instances.sort_by_key(|i| i.index);

        for instance in instances {
            match instance.shift {
                InputShift::None => {}
                InputShift::Delay(seconds) => {
                    args.push("-itsoffset".to_string());
                    args.push(format_seconds(seconds));
                }
                InputShift::Seek(seconds) => {
                    args.push("-ss".to_string());
                    args.push(format_seconds(seconds));
                }
            }
            args.push("-i".to_string());
            args.push(self.input_name.to_string());
        }
    }

    /// Select the supplied stream from each instance.
    fn add_stream_maps(&self, args: &mut Vec<String>) {
        for instance in self.plan.instances() {
            args.push("-map".to_string());
            args.push(format!(
                "{}:{}",
                instance.index,
                instance.supplies.stream_letter()
            ));
        }
    }

    fn add_codecs(&self, args: &mut Vec<String>) {
        args.push("-c:v".to_string());
        args.push(self.plan.video_codec.ffmpeg_value().to_string());
        args.push("-c:a".to_string());
        args.push(self.plan.audio_codec.ffmpeg_value().to_string());
    }
}

/// Render seconds in their shortest decimal form (`0.5`, `0.3`, `0`, `2`).
pub fn format_seconds(seconds: f64) -> String {
    // -0.0 would print as "-0"
    let value = if seconds == 0.0 { 0.0 } else { seconds };
    format!("{}", value)
}

/// Format arguments for pretty display (one option per line).
pub fn format_args_pretty(args: &[String]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if arg.starts_with('-') && i + 1 < args.len() && !args[i + 1].starts_with('-') {
            // Option with value
            result.push_str(&format!("{} {} \\\n", arg, args[i + 1]));
            i += 2;
        } else {
            result.push_str(&format!("{}\n", arg));
            i += 1;
        }
    }

    result
}
