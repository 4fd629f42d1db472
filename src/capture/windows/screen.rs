//! Windows display discovery and screen grab input
//!
//! Monitors are enumerated with GDI; the screen itself is grabbed by FFmpeg's
//! gdigrab device over the monitor's rectangle of the virtual desktop.

use crate::capture::traits::DisplayInfo;
use crate::recorder::error::RecordingResult;
use windows::{
    Win32::Foundation::{BOOL, LPARAM, RECT},
    Win32::Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFOEXW},
};

/// MONITORINFOF_PRIMARY
const PRIMARY_FLAG: u32 = 1;

struct Monitor {
    info: DisplayInfo,
    left: i32,
    top: i32,
}

fn enumerate_monitors() -> Vec<Monitor> {
    use std::mem::zeroed;

    let mut monitors: Vec<Monitor> = Vec::new();
    let monitors_ptr = &mut monitors as *mut Vec<Monitor>;

    unsafe extern "system" fn enum_monitors_callback(
        hmonitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        let monitors = &mut *(lparam.0 as *mut Vec<Monitor>);

        let mut monitor_info: MONITORINFOEXW = unsafe { zeroed() };
        monitor_info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;

        if unsafe { GetMonitorInfoW(hmonitor, &mut monitor_info.monitorInfo) }.as_bool() {
            let rect = monitor_info.monitorInfo.rcMonitor;
            let is_primary = (monitor_info.monitorInfo.dwFlags & PRIMARY_FLAG) != 0;

            let name_len = monitor_info
                .szDevice
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(monitor_info.szDevice.len());
            let name = String::from_utf16_lossy(&monitor_info.szDevice[..name_len]);

            monitors.push(Monitor {
                info: DisplayInfo {
                    id: monitors.len() as u32,
                    name,
                    width: (rect.right - rect.left) as u32,
                    height: (rect.bottom - rect.top) as u32,
                    scale_factor: 1.0,
                    is_primary,
                },
                left: rect.left,
                top: rect.top,
            });
        }

        BOOL::from(true)
    }

    unsafe {
        let _ = EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(enum_monitors_callback),
            LPARAM(monitors_ptr as isize),
        );
    }

    monitors
}

/// Get list of available displays
pub fn get_displays() -> Vec<DisplayInfo> {
    enumerate_monitors().into_iter().map(|m| m.info).collect()
}

/// The primary monitor
pub fn primary_display() -> Option<DisplayInfo> {
    let monitors = enumerate_monitors();
    let primary = monitors.iter().position(|m| m.info.is_primary).unwrap_or(0);
    monitors.into_iter().nth(primary).map(|m| m.info)
}

/// FFmpeg input arguments grabbing `display` through gdigrab
pub fn screen_input_args(display: &DisplayInfo, frame_rate: u32) -> Vec<String> {
    let (left, top) = enumerate_monitors()
        .into_iter()
        .find(|m| m.info.id == display.id)
        .map(|m| (m.left, m.top))
        .unwrap_or((0, 0));

    vec![
        "-f".to_string(),
        "gdigrab".to_string(),
        "-framerate".to_string(),
        frame_rate.to_string(),
        "-offset_x".to_string(),
        left.to_string(),
        "-offset_y".to_string(),
        top.to_string(),
        "-video_size".to_string(),
        format!("{}x{}", display.width, display.height),
        "-i".to_string(),
        "desktop".to_string(),
    ]
}

/// Desktop capture needs no permission on Windows
pub fn ensure_screen_access() -> RecordingResult<()> {
    Ok(())
}
