//! Memory model for the C interpreter
//!
//! - [`value`]: tagged runtime values (int, float, char, pointer, array)
//! - [`heap`]: the simulated byte-addressable address space shared by
//!   `malloc`'d blocks, frame storage and string literals
//!
//! # Type sizes
//!
//! Fixed, platform-independent sizes:
//! - `char`: 1 byte
//! - `int`: 4 bytes
//! - `float`: 4 bytes (stored as `f32`, computed as `f64`)
//! - pointers: 8 bytes regardless of pointee type
//! - `T[N]`: `N * size_of(T)` bytes
//!
//! # Pointer arithmetic
//!
//! Pointer arithmetic is scaled by pointee size:
//! ```text
//! ptr + n  →  ptr + (n * size_of(*ptr))
//! ```

pub mod heap;
pub mod value;

use crate::parser::ast::CType;
use value::Address;

/// Calculate the size of a type in bytes
pub fn size_of(ty: &CType) -> usize {
    match ty {
        CType::Int => 4,
        CType::Float => 4,
        CType::Char => 1,
        CType::Void => 0,
        CType::Pointer(_) => 8,
        CType::Array(elem, len) => len * size_of(elem),
    }
}

/// Advance a pointer by `count` elements of the pointee type
pub fn pointer_offset(addr: Address, count: i64, pointee: &CType) -> Address {
    let byte_offset = count * size_of(pointee) as i64;
    (addr as i64 + byte_offset) as Address
}

/// Element distance between two pointers of the same pointee type
pub fn pointer_distance(a: Address, b: Address, pointee: &CType) -> i64 {
    let size = size_of(pointee).max(1) as i64;
    (a as i64 - b as i64) / size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_of() {
        assert_eq!(size_of(&CType::Char), 1);
        assert_eq!(size_of(&CType::Int), 4);
        assert_eq!(size_of(&CType::Float), 4);
        assert_eq!(size_of(&CType::Int.pointer_to()), 8);
        assert_eq!(size_of(&CType::Char.pointer_to()), 8);
        assert_eq!(size_of(&CType::Int.array_of(5)), 20);
        assert_eq!(size_of(&CType::Int.array_of(3).array_of(2)), 24);
    }

    #[test]
    fn test_pointer_offset_scales_by_pointee() {
        assert_eq!(pointer_offset(0x1000, 3, &CType::Int), 0x100c);
        assert_eq!(pointer_offset(0x1000, 2, &CType::Char), 0x1002);
        assert_eq!(pointer_offset(0x100c, -3, &CType::Int), 0x1000);
    }

    #[test]
    fn test_pointer_distance() {
        assert_eq!(pointer_distance(0x100c, 0x1000, &CType::Int), 3);
        assert_eq!(pointer_distance(0x1000, 0x100c, &CType::Int), -3);
    }
}
