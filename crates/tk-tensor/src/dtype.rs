use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Result, TensorError};
use crate::storage::CpuStorage;

// Byte sizes in the registry must match the platform representation.
const _: () = assert!(std::mem::size_of::<f32>() == 4);
const _: () = assert!(std::mem::size_of::<f64>() == 8);
const _: () = assert!(std::mem::size_of::<i32>() == 4);
const _: () = assert!(std::mem::size_of::<i64>() == 8);
const _: () = assert!(std::mem::size_of::<u8>() == 1);
const _: () = assert!(std::mem::size_of::<u16>() == 2);
const _: () = assert!(std::mem::size_of::<bool>() == 1);

/// Kind of a dtype. Separates booleans and signed/unsigned integers that
/// share a byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeCode {
    Undefined,
    Bool,
    Int,
    UInt,
    Float,
}

/// Runtime tag identifying the element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Placeholder for an uninitialized tensor. Never valid for allocation
    /// or compute.
    Undefined,
    /// 32-bit floating point (`f32`).
    Float32,
    /// 64-bit floating point (`f64`).
    Float64,
    /// 32-bit signed integer (`i32`).
    Int32,
    /// 64-bit signed integer (`i64`).
    Int64,
    /// 8-bit unsigned integer (`u8`).
    UInt8,
    /// 16-bit unsigned integer (`u16`).
    UInt16,
    /// Boolean (`bool`), one byte per element.
    Bool,
}

/// Static description of a dtype: kind, element size and canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DTypeInfo {
    pub code: DTypeCode,
    /// Element size in bytes; zero for `Undefined`.
    pub byte_size: usize,
    pub name: &'static str,
}

// Indexed by `DType as usize`; order must follow the enum declaration.
static REGISTRY: [DTypeInfo; 8] = [
    DTypeInfo {
        code: DTypeCode::Undefined,
        byte_size: 0,
        name: "Undefined",
    },
    DTypeInfo {
        code: DTypeCode::Float,
        byte_size: 4,
        name: "Float32",
    },
    DTypeInfo {
        code: DTypeCode::Float,
        byte_size: 8,
        name: "Float64",
    },
    DTypeInfo {
        code: DTypeCode::Int,
        byte_size: 4,
        name: "Int32",
    },
    DTypeInfo {
        code: DTypeCode::Int,
        byte_size: 8,
        name: "Int64",
    },
    DTypeInfo {
        code: DTypeCode::UInt,
        byte_size: 1,
        name: "UInt8",
    },
    DTypeInfo {
        code: DTypeCode::UInt,
        byte_size: 2,
        name: "UInt16",
    },
    DTypeInfo {
        code: DTypeCode::Bool,
        byte_size: 1,
        name: "Bool",
    },
];

fn type_table() -> &'static HashMap<TypeId, DType> {
    static TABLE: OnceLock<HashMap<TypeId, DType>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            (TypeId::of::<f32>(), DType::Float32),
            (TypeId::of::<f64>(), DType::Float64),
            (TypeId::of::<i32>(), DType::Int32),
            (TypeId::of::<i64>(), DType::Int64),
            (TypeId::of::<u8>(), DType::UInt8),
            (TypeId::of::<u16>(), DType::UInt16),
            (TypeId::of::<bool>(), DType::Bool),
        ])
    })
}

impl DType {
    /// Every dtype that maps to a concrete primitive type.
    pub const ALL: [DType; 7] = [
        DType::Float32,
        DType::Float64,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::Bool,
    ];

    /// Registry entry for this dtype.
    pub fn info(&self) -> &'static DTypeInfo {
        &REGISTRY[*self as usize]
    }

    pub fn code(&self) -> DTypeCode {
        self.info().code
    }

    /// Size in bytes of a single element.
    ///
    /// # Errors
    /// Returns `UnsupportedDType` for `Undefined`.
    pub fn byte_size(&self) -> Result<usize> {
        match self {
            DType::Undefined => Err(TensorError::UnsupportedDType(
                "Undefined has no element size".to_string(),
            )),
            other => Ok(other.info().byte_size),
        }
    }

    /// Canonical human-readable name, e.g. `"Float32"`.
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Looks up a dtype by its canonical name.
    pub fn from_name(name: &str) -> Result<DType> {
        REGISTRY
            .iter()
            .position(|info| info.name == name)
            .map(|idx| DType::ALL_WITH_UNDEFINED[idx])
            .ok_or_else(|| TensorError::UnsupportedDType(name.to_string()))
    }

    /// Maps a Rust primitive type to its dtype at runtime.
    ///
    /// Only `f32`, `f64`, `i32`, `i64`, `u8`, `u16` and `bool` are mapped.
    /// Any other type fails; there is no fallback dtype.
    pub fn from_type<T: 'static>() -> Result<DType> {
        type_table()
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(|| TensorError::UnsupportedDType(type_name::<T>().to_string()))
    }

    pub fn is_float(&self) -> bool {
        self.code() == DTypeCode::Float
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.code(), DTypeCode::Int | DTypeCode::UInt)
    }

    pub fn is_bool(&self) -> bool {
        self.code() == DTypeCode::Bool
    }

    const ALL_WITH_UNDEFINED: [DType; 8] = [
        DType::Undefined,
        DType::Float32,
        DType::Float64,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::Bool,
    ];
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time mapping from a primitive type to its dtype.
///
/// Implemented for exactly the seven supported primitive types, so typed
/// tensor APIs reject any other element type at compile time.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Wraps an owned vector into typed storage.
    fn into_storage(data: Vec<Self>) -> CpuStorage;

    /// Borrows the storage as a slice of `Self`, if the variant matches.
    fn slice(storage: &CpuStorage) -> Option<&[Self]>;

    /// Mutable counterpart of [`Element::slice`].
    fn slice_mut(storage: &mut CpuStorage) -> Option<&mut [Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn into_storage(data: Vec<Self>) -> CpuStorage {
                CpuStorage::$variant(data)
            }

            fn slice(storage: &CpuStorage) -> Option<&[Self]> {
                match storage {
                    CpuStorage::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(storage: &mut CpuStorage) -> Option<&mut [Self]> {
                match storage {
                    CpuStorage::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f32, Float32, F32);
impl_element!(f64, Float64, F64);
impl_element!(i32, Int32, I32);
impl_element!(i64, Int64, I64);
impl_element!(u8, UInt8, U8);
impl_element!(u16, UInt16, U16);
impl_element!(bool, Bool, Bool);
