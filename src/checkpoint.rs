use std::{fs, mem, path::Path};

use log::info;
use machine_learning::arch::Model;
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{PipelineErr, Result};

/// Saves the flat parameter buffer of `model` as one named `f32` tensor per parameter.
///
/// Parent directories are created as needed and an existing file is replaced.
///
/// # Arguments
/// * `path` - The checkpoint file.
/// * `model` - The model the parameters belong to, which names and shapes them.
/// * `params` - The parameters, of length `model.size()`.
pub fn save<M: Model>(path: &Path, model: &M, params: &[f32]) -> Result<()> {
    if params.len() != model.size() {
        return Err(layout_err(
            path,
            format!("got {} parameters, the model has {}", params.len(), model.size()),
        ));
    }

    let to_err = |source| PipelineErr::Checkpoint {
        path: path.to_path_buf(),
        source,
    };

    let mut rest = params;
    let mut tensors = Vec::new();
    for (name, shape) in model.param_shapes() {
        let (head, tail) = rest.split_at(shape.iter().product());
        let view = TensorView::new(Dtype::F32, shape, bytemuck::cast_slice(head)).map_err(to_err)?;
        tensors.push((name, view));
        rest = tail;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    safetensors::serialize_to_file(tensors, &None, path).map_err(to_err)?;
    info!("saved model checkpoint to {}", path.display());
    Ok(())
}

/// Loads a checkpoint written by `save` for the same model layout.
///
/// # Arguments
/// * `path` - The checkpoint file.
/// * `model` - The model whose parameter names and shapes the checkpoint must match.
///
/// # Returns
/// The flat parameter buffer, or an error if a tensor is missing, extra, mistyped or
/// mis-shaped.
pub fn load<M: Model>(path: &Path, model: &M) -> Result<Vec<f32>> {
    let bytes = fs::read(path)?;
    let st = SafeTensors::deserialize(&bytes).map_err(|source| PipelineErr::Checkpoint {
        path: path.to_path_buf(),
        source,
    })?;

    let layout = model.param_shapes();
    if st.len() != layout.len() {
        return Err(layout_err(
            path,
            format!("found {} tensors, the model has {}", st.len(), layout.len()),
        ));
    }

    let mut params = Vec::with_capacity(model.size());
    for (name, shape) in layout {
        let view = st
            .tensor(&name)
            .map_err(|_| layout_err(path, format!("missing tensor {name}")))?;

        if view.dtype() != Dtype::F32 {
            return Err(layout_err(
                path,
                format!("tensor {name} is {:?}, expected F32", view.dtype()),
            ));
        }

        if view.shape() != shape.as_slice() {
            return Err(layout_err(
                path,
                format!("tensor {name} has shape {:?}, expected {shape:?}", view.shape()),
            ));
        }

        params.extend(
            view.data()
                .chunks_exact(mem::size_of::<f32>())
                .map(bytemuck::pod_read_unaligned::<f32>),
        );
    }

    info!("loaded model checkpoint from {}", path.display());
    Ok(params)
}

fn layout_err(path: &Path, msg: String) -> PipelineErr {
    PipelineErr::CheckpointLayout {
        path: path.to_path_buf(),
        msg,
    }
}
