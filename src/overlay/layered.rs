//! Per-pixel alpha presentation through a Win32 layered window
//!
//! softbuffer treats the top byte of each pixel as padding, so on Windows the
//! frame is pushed with `UpdateLayeredWindow(..., ULW_ALPHA)` from a
//! top-down 32-bit DIB section instead.

use anyhow::{anyhow, Context, Result};
use std::mem::zeroed;
use std::ptr::null_mut;
use tiny_skia::Pixmap;
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

use windows::Win32::Foundation::{COLORREF, HWND, POINT, SIZE};
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC,
    SelectObject, AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    BLENDFUNCTION, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowLongPtrW, SetWindowLongPtrW, UpdateLayeredWindow, GWL_EXSTYLE, ULW_ALPHA,
    WS_EX_LAYERED,
};

use crate::render::to_bgra_premultiplied;

/// Memory DC with a DIB section sized to the current frame
struct DibFrame {
    mem_dc: HDC,
    bitmap: HBITMAP,
    old_obj: HGDIOBJ,
    bits: *mut u8,
    width: u32,
    height: u32,
}

impl DibFrame {
    unsafe fn new(width: u32, height: u32) -> Result<Self> {
        let screen_dc = GetDC(HWND::default());
        let mem_dc = CreateCompatibleDC(screen_dc);
        ReleaseDC(HWND::default(), screen_dc);

        let bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width as i32,
                biHeight: -(height as i32), // Top-down
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0 as u32,
                ..zeroed()
            },
            bmiColors: [zeroed(); 1],
        };

        let mut bits_ptr: *mut std::ffi::c_void = null_mut();
        let bitmap = match CreateDIBSection(mem_dc, &bmi, DIB_RGB_COLORS, &mut bits_ptr, None, 0)
        {
            Ok(bitmap) => bitmap,
            Err(e) => {
                let _ = DeleteDC(mem_dc);
                return Err(anyhow!("CreateDIBSection failed: {}", e));
            }
        };

        if bits_ptr.is_null() {
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            return Err(anyhow!("DIB section has no pixel storage"));
        }

        let old_obj = SelectObject(mem_dc, bitmap);

        Ok(DibFrame {
            mem_dc,
            bitmap,
            old_obj,
            bits: bits_ptr as *mut u8,
            width,
            height,
        })
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        // SAFETY: the DIB section owns width * height 32-bit pixels until drop
        unsafe {
            std::slice::from_raw_parts_mut(self.bits, (self.width * self.height * 4) as usize)
        }
    }
}

impl Drop for DibFrame {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.mem_dc, self.old_obj);
            let _ = DeleteObject(self.bitmap);
            let _ = DeleteDC(self.mem_dc);
        }
    }
}

pub struct LayeredSurface {
    hwnd: HWND,
    frame: Option<DibFrame>,
}

impl LayeredSurface {
    /// Switch `window` to a layered window and take over its presentation
    pub fn new(window: &Window) -> Result<Self> {
        let handle = window
            .window_handle()
            .map_err(|e| anyhow!("No native handle for overlay window: {}", e))?;
        let RawWindowHandle::Win32(win32) = handle.as_raw() else {
            return Err(anyhow!("Overlay window is not a Win32 window"));
        };
        let hwnd = HWND(win32.hwnd.get());

        unsafe {
            let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
            SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style | WS_EX_LAYERED.0 as isize);
        }

        Ok(LayeredSurface { hwnd, frame: None })
    }

    pub fn present(&mut self, pixmap: &Pixmap) -> Result<()> {
        let (width, height) = (pixmap.width(), pixmap.height());
        let reuse = matches!(&self.frame, Some(f) if f.width == width && f.height == height);
        if !reuse {
            self.frame = None;
            self.frame = Some(unsafe { DibFrame::new(width, height) }?);
        }
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };

        to_bgra_premultiplied(pixmap, frame.pixels_mut());

        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            BlendFlags: 0,
            SourceConstantAlpha: 255,
            AlphaFormat: AC_SRC_ALPHA as u8,
        };
        let size = SIZE {
            cx: width as i32,
            cy: height as i32,
        };
        let src_point = POINT { x: 0, y: 0 };

        // No destination point: the window stays where winit put it
        unsafe {
            let screen_dc = GetDC(HWND::default());
            let result = UpdateLayeredWindow(
                self.hwnd,
                screen_dc,
                None,
                Some(&size),
                frame.mem_dc,
                Some(&src_point),
                COLORREF(0), // Unused when ULW_ALPHA is set
                Some(&blend),
                ULW_ALPHA,
            );
            ReleaseDC(HWND::default(), screen_dc);
            result.context("UpdateLayeredWindow failed")
        }
    }
}
