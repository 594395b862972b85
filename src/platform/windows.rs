//! General Windows platform utilities
//!
//! Conversions between Win32 structures and domain types.

use crate::domain::core::{Point, Rect};
use windows::Win32::Foundation::{LPARAM, RECT};

/// Converts a Windows RECT to domain rectangle
pub fn win32_rect_to_rect(rect: &RECT) -> Rect {
    Rect {
        x: rect.left,
        y: rect.top,
        w: rect.right - rect.left,
        h: rect.bottom - rect.top,
    }
}

/// Extracts the client-area cursor position carried by mouse messages
///
/// Coordinates are signed 16-bit values packed into the low and high words.
pub fn point_from_lparam(lparam: LPARAM) -> Point {
    let x = (lparam.0 & 0xFFFF) as u16 as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as u16 as i16 as i32;
    Point::new(x, y)
}

/// Null-terminated UTF-16 copy of `text`
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_conversion() {
        let rect = RECT {
            left: 10,
            top: 20,
            right: 110,
            bottom: 70,
        };
        assert_eq!(win32_rect_to_rect(&rect), Rect::new(10, 20, 100, 50));
    }

    #[test]
    fn lparam_point_is_signed() {
        assert_eq!(point_from_lparam(LPARAM((40 << 16) | 25)), Point::new(25, 40));
        assert_eq!(point_from_lparam(LPARAM(0xFFFF)), Point::new(-1, 0));
    }

    #[test]
    fn wide_string_is_terminated() {
        assert_eq!(to_wide("ab"), vec![97, 98, 0]);
    }
}
