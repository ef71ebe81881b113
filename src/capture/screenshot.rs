//! Screen-region capture backends.
//!
//! On Windows the region is copied out of the screen device context with GDI,
//! which covers the whole virtual screen (all monitors) and works with
//! borderless fullscreen games. Other platforms get a backend that reports
//! capture as unavailable so the rest of the pipeline stays usable in tests.

use super::{PixelBuffer, Region, ScreenCapture};
use crate::error::CaptureError;

/// Returns the capture backend for the current platform.
pub fn default_backend() -> Box<dyn ScreenCapture> {
    #[cfg(windows)]
    {
        Box::new(GdiScreenCapture)
    }
    #[cfg(not(windows))]
    {
        Box::new(UnavailableCapture)
    }
}

/// Backend used where no screen capture is implemented.
#[cfg_attr(windows, allow(dead_code))]
pub struct UnavailableCapture;

impl ScreenCapture for UnavailableCapture {
    fn grab(&self, _region: &Region) -> Result<PixelBuffer, CaptureError> {
        Err(CaptureError::Unavailable(format!(
            "no capture backend for {}",
            std::env::consts::OS
        )))
    }
}

#[cfg(windows)]
pub use gdi::GdiScreenCapture;

#[cfg(windows)]
mod gdi {
    use image::{ImageBuffer, Rgb};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT,
        DIB_RGB_COLORS, HBITMAP, HDC, ROP_CODE, SRCCOPY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    };

    use super::{CaptureError, PixelBuffer, Region, ScreenCapture};

    /// Captures screen regions with `BitBlt` from the desktop DC.
    pub struct GdiScreenCapture;

    /// Bounds of the virtual screen spanning all monitors.
    pub fn virtual_screen() -> Region {
        unsafe {
            Region::new(
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN).max(0) as u32,
                GetSystemMetrics(SM_CYVIRTUALSCREEN).max(0) as u32,
            )
        }
    }

    /// Releases the screen DC, memory DC and bitmap on every exit path.
    struct GdiResources {
        screen_dc: HDC,
        mem_dc: HDC,
        bitmap: HBITMAP,
    }

    impl Drop for GdiResources {
        fn drop(&mut self) {
            // The DC goes first so the bitmap is no longer selected when deleted
            unsafe {
                if !self.mem_dc.is_invalid() {
                    let _ = DeleteDC(self.mem_dc);
                }
                if !self.bitmap.is_invalid() {
                    let _ = DeleteObject(self.bitmap);
                }
                let _ = ReleaseDC(HWND::default(), self.screen_dc);
            }
        }
    }

    impl ScreenCapture for GdiScreenCapture {
        fn grab(&self, region: &Region) -> Result<PixelBuffer, CaptureError> {
            let screen = virtual_screen();
            if !region.is_within(&screen) {
                return Err(CaptureError::OutOfBounds {
                    region: *region,
                    screen,
                });
            }

            let width = region.width as i32;
            let height = region.height as i32;

            let screen_dc = unsafe { GetDC(HWND::default()) };
            if screen_dc.is_invalid() {
                return Err(CaptureError::Backend("GetDC failed".to_string()));
            }
            let mut res = GdiResources {
                screen_dc,
                mem_dc: HDC::default(),
                bitmap: HBITMAP::default(),
            };

            res.mem_dc = unsafe { CreateCompatibleDC(res.screen_dc) };
            if res.mem_dc.is_invalid() {
                return Err(CaptureError::Backend("CreateCompatibleDC failed".to_string()));
            }
            res.bitmap = unsafe { CreateCompatibleBitmap(res.screen_dc, width, height) };
            if res.bitmap.is_invalid() {
                return Err(CaptureError::Backend("CreateCompatibleBitmap failed".to_string()));
            }

            let blit = unsafe {
                let previous = SelectObject(res.mem_dc, res.bitmap);
                let blit = BitBlt(
                    res.mem_dc,
                    0,
                    0,
                    width,
                    height,
                    res.screen_dc,
                    region.x,
                    region.y,
                    ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
                );
                SelectObject(res.mem_dc, previous);
                blit
            };
            blit.map_err(|e| CaptureError::Backend(format!("BitBlt failed: {}", e)))?;

            // Top-down 32-bit BGRX rows
            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut bgrx = vec![0u8; region.width as usize * region.height as usize * 4];

            let lines = unsafe {
                GetDIBits(
                    res.mem_dc,
                    res.bitmap,
                    0,
                    region.height,
                    Some(bgrx.as_mut_ptr().cast()),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            };
            if lines != height {
                return Err(CaptureError::Backend(format!(
                    "GetDIBits copied {} of {} rows",
                    lines, height
                )));
            }

            // BGRX -> RGB
            let rgb: Vec<u8> = bgrx
                .chunks_exact(4)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect();

            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(region.width, region.height, rgb)
                .ok_or_else(|| CaptureError::Backend("pixel buffer size mismatch".to_string()))
        }
    }
}
