//! macOS display discovery and screen grab input

use crate::capture::traits::DisplayInfo;
use core_graphics::display::CGDisplay;

/// Get list of available displays
pub fn get_displays() -> Vec<DisplayInfo> {
    let display_ids = CGDisplay::active_displays().unwrap_or_default();

    display_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            let display = CGDisplay::new(id);
            let bounds = display.bounds();
            let is_main = display.is_main();
            let pixels_high = display.pixels_high() as u32;

            DisplayInfo {
                id,
                name: if is_main {
                    "Main Display".to_string()
                } else {
                    format!("Display {}", index + 1)
                },
                width: display.pixels_wide() as u32,
                height: pixels_high,
                scale_factor: if bounds.size.height > 0.0 {
                    pixels_high as f64 / bounds.size.height
                } else {
                    1.0
                },
                is_primary: is_main,
            }
        })
        .collect()
}

/// The main display
pub fn primary_display() -> Option<DisplayInfo> {
    let displays = get_displays();
    let primary = displays.iter().position(|d| d.is_primary).unwrap_or(0);
    displays.into_iter().nth(primary)
}

/// FFmpeg input arguments grabbing `display` through AVFoundation
pub fn screen_input_args(display: &DisplayInfo, frame_rate: u32) -> Vec<String> {
    // AVFoundation numbers screens in active display order
    let index = CGDisplay::active_displays()
        .unwrap_or_default()
        .iter()
        .position(|&id| id == display.id)
        .unwrap_or(0);

    vec![
        "-f".to_string(),
        "avfoundation".to_string(),
        "-capture_cursor".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        frame_rate.to_string(),
        "-i".to_string(),
        format!("Capture screen {}:none", index),
    ]
}
