// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Element kinds and tensor values exchanged with the store
//!
//! Only the two kinds the bridge moves are modelled: 32-bit integers
//! (step types, info vectors) and 64-bit floats (state, reward, action,
//! real scalars).

use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// The element kind of a tensor, named the way the store names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Signed 32-bit little-endian integer
    Int32,
    /// 8-byte floating point value
    Double,
}

impl ElementKind {
    /// Store-side type name
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Int32 => "INT32",
            ElementKind::Double => "DOUBLE",
        }
    }

    /// Width of one element in bytes
    pub fn width(&self) -> usize {
        match self {
            ElementKind::Int32 => 4,
            ElementKind::Double => 8,
        }
    }

    /// Parse a store-side type name
    pub fn from_name(name: &str) -> BridgeResult<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INT32" => Ok(ElementKind::Int32),
            "DOUBLE" => Ok(ElementKind::Double),
            other => Err(BridgeError::TypeError(format!(
                "unsupported tensor type {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory layout tag attached to a tensor
///
/// Every tensor written by the bridge is one-dimensional, so both layouts
/// describe the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryLayout {
    #[default]
    Contiguous,
    FortranContiguous,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// Element types the process group can move.
///
/// With the `mpi` feature this also demands an MPI datatype equivalence.
#[cfg(feature = "mpi")]
pub trait CommElement: mpi::datatype::Equivalence {}
#[cfg(feature = "mpi")]
impl<T: mpi::datatype::Equivalence> CommElement for T {}

#[cfg(not(feature = "mpi"))]
pub trait CommElement {}
#[cfg(not(feature = "mpi"))]
impl<T> CommElement for T {}

/// A value type that can travel through the process group and the store
pub trait Element:
    sealed::Sealed + CommElement + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: ElementKind;
    const ZERO: Self;

    fn into_tensor_data(values: Vec<Self>) -> TensorData;

    /// Borrow the values if `data` holds this kind
    fn from_tensor_data(data: &TensorData) -> BridgeResult<&[Self]>;
}

impl Element for i32 {
    const KIND: ElementKind = ElementKind::Int32;
    const ZERO: Self = 0;

    fn into_tensor_data(values: Vec<Self>) -> TensorData {
        TensorData::Int32(values)
    }

    fn from_tensor_data(data: &TensorData) -> BridgeResult<&[Self]> {
        match data {
            TensorData::Int32(v) => Ok(v),
            other => Err(kind_mismatch(Self::KIND, other.kind())),
        }
    }
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::Double;
    const ZERO: Self = 0.0;

    fn into_tensor_data(values: Vec<Self>) -> TensorData {
        TensorData::Double(values)
    }

    fn from_tensor_data(data: &TensorData) -> BridgeResult<&[Self]> {
        match data {
            TensorData::Double(v) => Ok(v),
            other => Err(kind_mismatch(Self::KIND, other.kind())),
        }
    }
}

fn kind_mismatch(expected: ElementKind, found: ElementKind) -> BridgeError {
    BridgeError::TypeError(format!("expected {} tensor, found {}", expected, found))
}

/// Typed tensor payload
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int32(Vec<i32>),
    Double(Vec<f64>),
}

impl TensorData {
    pub fn kind(&self) -> ElementKind {
        match self {
            TensorData::Int32(_) => ElementKind::Int32,
            TensorData::Double(_) => ElementKind::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::Int32(v) => v.len(),
            TensorData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian byte image, the blob format of the store
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.kind().width());
        match self {
            TensorData::Int32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::Double(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
        }
        out
    }

    pub fn from_le_bytes(kind: ElementKind, bytes: &[u8]) -> BridgeResult<Self> {
        if bytes.len() % kind.width() != 0 {
            return Err(BridgeError::Serialization(format!(
                "{} byte blob is not a whole number of {} elements",
                bytes.len(),
                kind
            )));
        }
        Ok(match kind {
            ElementKind::Int32 => TensorData::Int32(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ElementKind::Double => TensorData::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        })
    }
}

/// A flat, typed, shaped buffer as the store understands it
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dims: Vec<usize>,
    layout: MemoryLayout,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor, checking that `dims` covers exactly the data
    pub fn new(dims: Vec<usize>, layout: MemoryLayout, data: TensorData) -> BridgeResult<Self> {
        let expected: usize = dims.iter().product();
        if expected != data.len() {
            return Err(BridgeError::Invalid(format!(
                "tensor dims {:?} describe {} elements but {} were given",
                dims,
                expected,
                data.len()
            )));
        }
        Ok(Self { dims, layout, data })
    }

    /// One-dimensional contiguous tensor
    pub fn vector<T: Element>(values: Vec<T>) -> Self {
        Self {
            dims: vec![values.len()],
            layout: MemoryLayout::Contiguous,
            data: T::into_tensor_data(values),
        }
    }

    /// Length-1 tensor wrapping a scalar
    pub fn scalar<T: Element>(value: T) -> Self {
        Self::vector(vec![value])
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Borrow the values as `T`, failing on a kind mismatch
    pub fn values<T: Element>(&self) -> BridgeResult<&[T]> {
        T::from_tensor_data(&self.data)
    }
}
