//! Top-level window hosting the falling notes
//!
//! The window thread is the UI context. Left clicks spawn notes; the
//! ticker thread's note callbacks post a private message through the waker
//! and the window procedure drains the note queue when it arrives. Wakes are
//! coalesced: only one drain message is in flight at a time.

use std::ffi::c_void;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BeginPaint, DIB_RGB_COLORS, EndPaint, InvalidateRect, PAINTSTRUCT,
    SetDIBitsToDevice, UpdateWindow,
};
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow,
    DispatchMessageW, GWLP_USERDATA, GetClientRect, GetMessageW, GetWindowLongPtrW, IDC_ARROW, LoadCursorW, MSG, PostMessageW,
    PostQuitMessage, RegisterClassW, SW_SHOW, SetWindowLongPtrW, SetWindowTextW, ShowWindow, TranslateMessage, WM_APP,
    UnregisterClassW, WM_DESTROY, WM_ERASEBKGND, WM_LBUTTONDOWN, WM_NCDESTROY, WM_PAINT, WM_SIZE, WNDCLASSW,
    WINDOW_EX_STYLE, WS_OVERLAPPEDWINDOW,
};
use windows::core::{PCWSTR, w};

use crate::app::controller::{AppError, NotesApp};
use crate::app::dispatch::Waker;
use crate::config::NotesConfig;
use crate::domain::core::Rect;
use crate::platform::windows::{point_from_lparam, to_wide, win32_rect_to_rect};
use crate::ui::renderer::{NoteRenderer, SceneLayout};

/// Posted by the waker when note work is waiting in the UI queue
const WM_DRAIN_QUEUE: u32 = WM_APP + 1;

const CLASS_NAME: PCWSTR = w!("FallingNotesWindow");

/// Window creation errors
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Failed to get module handle: {0}")]
    ModuleHandle(#[from] windows::core::Error),

    #[error("Failed to register window class")]
    WindowClassRegistrationFailed,

    #[error("Failed to create main window")]
    WindowCreationFailed,
}

/// Window and class registration owned until creation completes
///
/// Dropping the guard destroys the window and unregisters the class, so a
/// failure after `CreateWindowExW` leaves nothing behind.
struct WindowGuard {
    hwnd: HWND,
    hinstance: HMODULE,
}

impl WindowGuard {
    /// Hand the window over to the caller; the class stays registered
    fn release(self) -> HWND {
        let hwnd = self.hwnd;
        std::mem::forget(self);
        hwnd
    }
}

impl Drop for WindowGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyWindow(self.hwnd);
            let _ = UnregisterClassW(CLASS_NAME, self.hinstance);
        }
        debug!("window creation abandoned, window destroyed");
    }
}

/// State reachable from the window procedure through `GWLP_USERDATA`
struct WindowState {
    app: NotesApp,
    renderer: NoteRenderer,
    drain_pending: Arc<AtomicBool>,
}

impl WindowState {
    fn client_rect(hwnd: HWND) -> Option<Rect> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(hwnd, &mut rect) }.ok()?;
        Some(win32_rect_to_rect(&rect))
    }

    fn refresh_caption(&self, hwnd: HWND) {
        let caption = to_wide(&self.app.caption());
        let _ = unsafe { SetWindowTextW(hwnd, PCWSTR(caption.as_ptr())) };
    }

    fn drain(&mut self, hwnd: HWND) {
        self.drain_pending.store(false, Ordering::Release);
        let report = self.app.pump();
        if report.processed > 0 {
            unsafe { InvalidateRect(hwnd, None, false) };
        }
        if report.notes_changed() {
            self.refresh_caption(hwnd);
        }
    }

    fn paint(&self, hwnd: HWND) {
        unsafe {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);

            if let Some(client) = Self::client_rect(hwnd) {
                let frame = SceneLayout::from_host(self.app.host(), client)
                    .and_then(|layout| self.renderer.render_layout(&layout));

                match frame {
                    Ok(pixmap) => {
                        let pixels = self.renderer.pixmap_to_bgra(&pixmap);
                        let mut info = BITMAPINFO::default();
                        info.bmiHeader = BITMAPINFOHEADER {
                            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                            biWidth: pixmap.width() as i32,
                            biHeight: -(pixmap.height() as i32), // top-down rows
                            biPlanes: 1,
                            biBitCount: 32,
                            biCompression: BI_RGB.0,
                            ..Default::default()
                        };

                        SetDIBitsToDevice(
                            hdc,
                            0,
                            0,
                            pixmap.width(),
                            pixmap.height(),
                            0,
                            0,
                            0,
                            pixmap.height(),
                            pixels.as_ptr() as *const c_void,
                            &info,
                            DIB_RGB_COLORS,
                        );
                    }
                    // Minimized windows have an empty client area
                    Err(e) => debug!(error = %e, "skipping paint"),
                }
            }

            EndPaint(hwnd, &ps);
        }
    }
}

/// Main application window
pub struct NotesWindow {
    hwnd: HWND,
    state: Box<WindowState>,
}

impl NotesWindow {
    /// Create the window, wire the waker to it and start the ticker
    pub fn create(config: NotesConfig) -> Result<Self, AppError> {
        let guard = Self::create_window(&config)?;
        let hwnd = guard.hwnd;

        let drain_pending = Arc::new(AtomicBool::new(false));
        let waker = Self::waker_for(hwnd, Arc::clone(&drain_pending));
        let mut app = NotesApp::with_waker(config, waker)?;

        if let Some(client) = WindowState::client_rect(hwnd) {
            app.set_bounds(client);
        }
        app.start()?;

        let mut state = Box::new(WindowState {
            app,
            renderer: NoteRenderer::new(),
            drain_pending,
        });

        let hwnd = guard.release();
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, state.as_mut() as *mut WindowState as isize);
        }
        state.refresh_caption(hwnd);

        Ok(Self { hwnd, state })
    }

    /// Show the window and run the message loop until it is closed
    pub fn run(self) -> Result<(), AppError> {
        unsafe {
            ShowWindow(self.hwnd, SW_SHOW);
            UpdateWindow(self.hwnd);
        }
        info!("window shown, click to drop notes");

        let mut msg = MSG::default();
        loop {
            let result: BOOL = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            // 0 is WM_QUIT, -1 is an error
            if result.0 == 0 || result.0 == -1 {
                break;
            }
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        // WM_DESTROY already shut the app down; this covers a loop error
        unsafe { SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0) };
        if let Ok(hinstance) = unsafe { GetModuleHandleW(None) } {
            let _ = unsafe { UnregisterClassW(CLASS_NAME, hinstance) };
        }
        let mut state = self.state;
        state.app.shutdown()?;
        Ok(())
    }

    fn waker_for(hwnd: HWND, drain_pending: Arc<AtomicBool>) -> Waker {
        let raw = hwnd.0;
        Arc::new(move || {
            if !drain_pending.swap(true, Ordering::AcqRel) {
                let _ = unsafe { PostMessageW(HWND(raw), WM_DRAIN_QUEUE, WPARAM(0), LPARAM(0)) };
            }
        })
    }

    fn create_window(config: &NotesConfig) -> Result<WindowGuard, WindowError> {
        let class_name = CLASS_NAME;
        let hinstance = unsafe { GetModuleHandleW(None)? };

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
            lpszClassName: class_name,
            ..Default::default()
        };

        if unsafe { RegisterClassW(&wc) } == 0 {
            return Err(WindowError::WindowClassRegistrationFailed);
        }

        // Size the outer frame so the client area matches the configuration
        let mut frame = RECT {
            left: 0,
            top: 0,
            right: config.window_width,
            bottom: config.window_height,
        };
        let _ = unsafe { AdjustWindowRect(&mut frame, WS_OVERLAPPEDWINDOW, false) };

        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                w!("0 Active Notes"),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                frame.right - frame.left,
                frame.bottom - frame.top,
                None,
                None,
                hinstance,
                None,
            )
        };

        if hwnd.0 == 0 {
            let _ = unsafe { UnregisterClassW(class_name, hinstance) };
            return Err(WindowError::WindowCreationFailed);
        }

        Ok(WindowGuard { hwnd, hinstance })
    }
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let state_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut WindowState;
    if state_ptr.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    match msg {
        WM_DRAIN_QUEUE => {
            let state = unsafe { &mut *state_ptr };
            state.drain(hwnd);
            LRESULT(0)
        }
        WM_LBUTTONDOWN => {
            let state = unsafe { &mut *state_ptr };
            state.app.spawn_note(point_from_lparam(lparam));
            state.refresh_caption(hwnd);
            unsafe { InvalidateRect(hwnd, None, false) };
            LRESULT(0)
        }
        WM_SIZE => {
            let state = unsafe { &mut *state_ptr };
            let width = (lparam.0 & 0xFFFF) as i32;
            let height = ((lparam.0 >> 16) & 0xFFFF) as i32;
            state.app.set_bounds(Rect::from_size(width, height));
            LRESULT(0)
        }
        WM_PAINT => {
            let state = unsafe { &*state_ptr };
            state.paint(hwnd);
            LRESULT(0)
        }
        // The whole client area is repainted from the pixmap
        WM_ERASEBKGND => LRESULT(1),
        WM_DESTROY => {
            let state = unsafe { &mut *state_ptr };
            if let Err(e) = state.app.shutdown() {
                error!(error = %e, "shutdown failed");
            }
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        WM_NCDESTROY => {
            unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) };
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
