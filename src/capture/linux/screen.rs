//! Linux display discovery and screen grab input

use crate::capture::traits::DisplayInfo;
use crate::recorder::error::{RecordingError, RecordingResult};
use std::process::Command;

/// A connected, active xrandr output
#[derive(Debug, Clone, PartialEq)]
struct XrandrOutput {
    name: String,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    primary: bool,
}

/// Parse `WIDTHxHEIGHT+X+Y`
fn parse_geometry(token: &str) -> Option<(u32, u32, i32, i32)> {
    let (size, offset) = token.split_once('+')?;
    let (width, height) = size.split_once('x')?;
    let (x, y) = offset.split_once('+')?;
    Some((width.parse().ok()?, height.parse().ok()?, x.parse().ok()?, y.parse().ok()?))
}

/// Parse `xrandr --current` output into its active outputs
fn parse_xrandr(output: &str) -> Vec<XrandrOutput> {
    output
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.get(1) != Some(&"connected") {
                return None;
            }
            let primary = tokens.get(2) == Some(&"primary");
            let (width, height, x, y) = tokens.iter().skip(2).find_map(|t| parse_geometry(t))?;
            Some(XrandrOutput {
                name: tokens[0].to_string(),
                width,
                height,
                x,
                y,
                primary,
            })
        })
        .collect()
}

fn xrandr_outputs() -> Vec<XrandrOutput> {
    match Command::new("xrandr").arg("--current").output() {
        Ok(output) if output.status.success() => {
            parse_xrandr(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            tracing::warn!("xrandr exited with {}", output.status);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to run xrandr: {}", e);
            Vec::new()
        }
    }
}

fn to_display_info(index: usize, output: &XrandrOutput) -> DisplayInfo {
    DisplayInfo {
        id: index as u32,
        name: output.name.clone(),
        width: output.width,
        height: output.height,
        scale_factor: 1.0,
        is_primary: output.primary,
    }
}

/// Get list of available displays
pub fn get_displays() -> Vec<DisplayInfo> {
    xrandr_outputs()
        .iter()
        .enumerate()
        .map(|(index, output)| to_display_info(index, output))
        .collect()
}

/// The primary output, or the first active one when none is marked primary
pub fn primary_display() -> Option<DisplayInfo> {
    let displays = get_displays();
    let primary = displays.iter().position(|d| d.is_primary).unwrap_or(0);
    displays.into_iter().nth(primary)
}

fn x11_display() -> String {
    std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string())
}

/// FFmpeg input arguments grabbing `display` through x11grab
pub fn screen_input_args(display: &DisplayInfo, frame_rate: u32) -> Vec<String> {
    let (x, y) = xrandr_outputs()
        .into_iter()
        .find(|o| o.name == display.name)
        .map(|o| (o.x, o.y))
        .unwrap_or((0, 0));
    x11grab_args(&x11_display(), display, x, y, frame_rate)
}

fn x11grab_args(x_display: &str, display: &DisplayInfo, x: i32, y: i32, frame_rate: u32) -> Vec<String> {
    vec![
        "-f".to_string(),
        "x11grab".to_string(),
        "-framerate".to_string(),
        frame_rate.to_string(),
        "-video_size".to_string(),
        format!("{}x{}", display.width, display.height),
        "-i".to_string(),
        format!("{}+{},{}", x_display, x, y),
    ]
}

/// Screen grabbing needs an X server to talk to
pub fn ensure_screen_access() -> RecordingResult<()> {
    if std::env::var_os("DISPLAY").is_none() {
        return Err(RecordingError::Capture(
            "DISPLAY is not set; screen capture needs an X11 session".to_string(),
        ));
    }
    Ok(())
}
