use std::{fs, mem, path::Path};

use bytemuck::Pod;
use half::f16;
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{DataErr, Result};

/// The key every tensor is stored under.
pub const TENSOR_KEY: &str = "data";

/// An element type that can be written to a tensor file.
pub trait Element: Pod {
    const DTYPE: Dtype;
}

impl Element for u8 {
    const DTYPE: Dtype = Dtype::U8;
}

impl Element for i32 {
    const DTYPE: Dtype = Dtype::I32;
}

impl Element for i64 {
    const DTYPE: Dtype = Dtype::I64;
}

impl Element for f16 {
    const DTYPE: Dtype = Dtype::F16;
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;
}

impl Element for f64 {
    const DTYPE: Dtype = Dtype::F64;
}

/// A tensor read from disk, in the element type it was stored with.
///
/// Half precision tensors are widened to `f32` on read.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    U8(ArrayD<u8>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::U8(a) => a.shape(),
            Tensor::I32(a) => a.shape(),
            Tensor::I64(a) => a.shape(),
            Tensor::F32(a) => a.shape(),
            Tensor::F64(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Casts every element to `f32`.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match self {
            Tensor::U8(a) => a.mapv(f32::from),
            Tensor::I32(a) => a.mapv(|x| x as f32),
            Tensor::I64(a) => a.mapv(|x| x as f32),
            Tensor::F32(a) => a.clone(),
            Tensor::F64(a) => a.mapv(|x| x as f32),
        }
    }

    /// Casts every element to `i64`, truncating floats toward zero.
    pub fn to_i64(&self) -> ArrayD<i64> {
        match self {
            Tensor::U8(a) => a.mapv(i64::from),
            Tensor::I32(a) => a.mapv(i64::from),
            Tensor::I64(a) => a.clone(),
            Tensor::F32(a) => a.mapv(|x| x as i64),
            Tensor::F64(a) => a.mapv(|x| x as i64),
        }
    }
}

/// Reads the tensor stored in a safetensors file.
///
/// The tensor under `TENSOR_KEY` is used; a file holding a single tensor under any other name
/// is accepted too.
///
/// # Arguments
/// * `path` - The file to read.
///
/// # Returns
/// The decoded tensor or an error if the file is missing, malformed or uses an unsupported
/// element type.
pub fn read_tensor(path: &Path) -> Result<Tensor> {
    if !path.is_file() {
        return Err(DataErr::MissingFile(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let to_err = |source| DataErr::Safetensors {
        path: path.to_path_buf(),
        source,
    };

    let st = SafeTensors::deserialize(&bytes).map_err(to_err)?;
    let view = match st.tensor(TENSOR_KEY) {
        Ok(view) => view,
        Err(_) => {
            let names = st.names();
            let [name] = names.as_slice() else {
                return Err(DataErr::TensorNotFound {
                    path: path.to_path_buf(),
                });
            };
            st.tensor(name).map_err(to_err)?
        }
    };

    let shape = IxDyn(view.shape());
    let data = view.data();

    let tensor = match view.dtype() {
        Dtype::U8 => Tensor::U8(ArrayD::from_shape_vec(shape, data.to_vec())?),
        Dtype::I32 => Tensor::I32(ArrayD::from_shape_vec(shape, decode(data))?),
        Dtype::I64 => Tensor::I64(ArrayD::from_shape_vec(shape, decode(data))?),
        Dtype::F16 => {
            let values = decode::<f16>(data).into_iter().map(f16::to_f32).collect();
            Tensor::F32(ArrayD::from_shape_vec(shape, values)?)
        }
        Dtype::F32 => Tensor::F32(ArrayD::from_shape_vec(shape, decode(data))?),
        Dtype::F64 => Tensor::F64(ArrayD::from_shape_vec(shape, decode(data))?),
        other => {
            return Err(DataErr::UnsupportedDtype {
                path: path.to_path_buf(),
                dtype: format!("{other:?}"),
            });
        }
    };

    Ok(tensor)
}

/// Writes `array` to a safetensors file under `TENSOR_KEY`, replacing any existing file.
///
/// # Arguments
/// * `path` - The destination file.
/// * `array` - The tensor to write, stored in row-major order.
pub fn write_tensor<A, D>(path: &Path, array: ArrayView<'_, A, D>) -> Result<()>
where
    A: Element,
    D: Dimension,
{
    let values: Vec<A> = array.iter().copied().collect();
    let to_err = |source| DataErr::Safetensors {
        path: path.to_path_buf(),
        source,
    };

    let view = TensorView::new(A::DTYPE, array.shape().to_vec(), bytemuck::cast_slice(&values))
        .map_err(to_err)?;
    safetensors::serialize_to_file([(TENSOR_KEY, view)], &None, path).map_err(to_err)
}

/// Decodes little-endian elements from a possibly unaligned byte buffer.
fn decode<T: Pod>(data: &[u8]) -> Vec<T> {
    data.chunks_exact(mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ndarray::{Array1, Array3, array};

    use super::*;

    #[test]
    fn f32_tensor_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        let x = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 12 + j * 4 + k) as f32);

        write_tensor(&path, x.view()).unwrap();
        let read = read_tensor(&path).unwrap();

        assert_eq!(read, Tensor::F32(x.into_dyn()));
    }

    #[test]
    fn u8_images_cast_to_f32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        write_tensor(&path, array![[0u8, 128], [255, 7]].view()).unwrap();

        let read = read_tensor(&path).unwrap();
        assert_eq!(read.shape(), &[2, 2]);
        assert_eq!(
            read.to_f32().into_raw_vec_and_offset().0,
            vec![0.0, 128.0, 255.0, 7.0]
        );
    }

    #[test]
    fn half_precision_is_widened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        let x = Array1::from_vec(vec![f16::from_f32(0.5), f16::from_f32(-2.0)]);
        write_tensor(&path, x.view()).unwrap();

        let Tensor::F32(read) = read_tensor(&path).unwrap() else {
            panic!("expected an f32 tensor");
        };
        assert_eq!(read.into_raw_vec_and_offset().0, vec![0.5, -2.0]);
    }

    #[test]
    fn float_targets_truncate_to_i64() {
        let t = Tensor::F64(array![1.9, 2.0, 7.2].into_dyn());
        assert_eq!(t.to_i64(), array![1i64, 2, 7].into_dyn());
    }

    #[test]
    fn single_tensor_under_other_name_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        let values = [3i64, 1, 4];
        let view = TensorView::new(Dtype::I64, vec![3], bytemuck::cast_slice(&values)).unwrap();
        safetensors::serialize_to_file([("labels", view)], &None, &path).unwrap();

        let read = read_tensor(&path).unwrap();
        assert_eq!(read, Tensor::I64(array![3i64, 1, 4].into_dyn()));
    }

    #[test]
    fn ambiguous_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        let a = [1i64];
        let b = [2i64];
        let tensors: HashMap<&str, TensorView> = HashMap::from([
            ("a", TensorView::new(Dtype::I64, vec![1], bytemuck::cast_slice(&a)).unwrap()),
            ("b", TensorView::new(Dtype::I64, vec![1], bytemuck::cast_slice(&b)).unwrap()),
        ]);
        safetensors::serialize_to_file(tensors, &None, &path).unwrap();

        let err = read_tensor(&path).unwrap_err();
        assert!(matches!(err, DataErr::TensorNotFound { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tensor(&dir.path().join("nope.safetensors")).unwrap_err();
        assert!(matches!(err, DataErr::MissingFile(_)));
    }
}
