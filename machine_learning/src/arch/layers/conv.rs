use ndarray::{ArrayD, Ix4, prelude::*, s};
use rand::Rng;
use rayon::prelude::*;

use crate::{MlErr, Result, init};

/// A 2D convolution with stride 1 and no padding over `[n, c, h, w]` inputs.
///
/// Its parameter slice holds the kernels `[out, in, k, k]` in row-major order followed by the
/// biases `[out]`. Each sample is lowered to a column matrix (im2col) so the convolution
/// becomes one matrix product per sample; samples of a batch run in parallel.
#[derive(Clone, Debug)]
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel: usize,

    // Forward metadata
    cols: Vec<Array2<f32>>,
    input_dim: Option<(usize, usize, usize, usize)>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `out_channels` - The amount of kernels, that is, channels of the output.
    /// * `kernel` - The side of the square kernels.
    pub fn new(in_channels: usize, out_channels: usize, kernel: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel,
            cols: Vec::new(),
            input_dim: None,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.weight_size() + self.out_channels
    }

    pub fn param_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        let k = self.kernel;
        vec![
            ("weight", vec![self.out_channels, self.in_channels, k, k]),
            ("bias", vec![self.out_channels]),
        ]
    }

    pub fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        init::fan_in_uniform(params, self.patch_len(), rng)
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, c, h, w) = x.dim();
        if c != self.in_channels {
            return Err(MlErr::SizeMismatch {
                what: "conv2d input channels",
                got: c,
                expected: self.in_channels,
            });
        }

        let k = self.kernel;
        if h < k || w < k {
            return Err(MlErr::InvalidInputShape {
                got: vec![c, h, w],
                expected: vec![c, k, k],
            });
        }

        let (oh, ow) = (h - k + 1, w - k + 1);
        let (weights, bias) = self.view_params(params)?;

        let lowered: Vec<(Array2<f32>, Array2<f32>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let cols = im2col(x.index_axis(Axis(0), i), k)?;
                let mut out = weights.dot(&cols);
                out += &bias.insert_axis(Axis(1));
                Ok((cols, out))
            })
            .collect::<Result<_>>()?;

        let mut y = Array4::zeros((n, self.out_channels, oh, ow));
        self.cols = Vec::with_capacity(n);

        for (mut y_i, (cols, out)) in y.outer_iter_mut().zip(lowered) {
            y_i.assign(&out.into_shape_with_order((self.out_channels, oh, ow))?);
            self.cols.push(cols);
        }

        self.input_dim = Some((n, c, h, w));
        Ok(y.into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let (n, c, h, w) = self
            .input_dim
            .take()
            .ok_or(MlErr::BackwardBeforeForward { layer: "conv2d" })?;
        let cols = std::mem::take(&mut self.cols);

        let k = self.kernel;
        let (oh, ow) = (h - k + 1, w - k + 1);
        let d = d.into_dimensionality::<Ix4>()?;
        if d.dim() != (n, self.out_channels, oh, ow) {
            return Err(MlErr::GradientShape {
                layer: "conv2d",
                got: d.shape().to_vec(),
                expected: vec![n, self.out_channels, oh, ow],
            });
        }

        let d = d.as_standard_layout();
        let (weights, _) = self.view_params(params)?;
        let out_channels = self.out_channels;

        let partials: Vec<(Array2<f32>, Array1<f32>, Array3<f32>)> = cols
            .par_iter()
            .enumerate()
            .map(|(i, cols)| {
                let d_i = d
                    .index_axis(Axis(0), i)
                    .into_shape_with_order((out_channels, oh * ow))?;
                let dw = d_i.dot(&cols.t());
                let db = d_i.sum_axis(Axis(1));
                let dcols = weights.t().dot(&d_i);
                let dx = col2im(dcols.view(), (c, h, w), k)?;
                Ok((dw, db, dx))
            })
            .collect::<Result<_>>()?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw.fill(0.0);
        db.fill(0.0);

        let mut dx = Array4::zeros((n, c, h, w));
        for (mut dx_i, (dw_i, db_i, x_i)) in dx.outer_iter_mut().zip(partials) {
            dw += &dw_i;
            db += &db_i;
            dx_i.assign(&x_i);
        }

        Ok(dx.into_dyn())
    }

    fn patch_len(&self) -> usize {
        self.in_channels * self.kernel * self.kernel
    }

    fn weight_size(&self) -> usize {
        self.out_channels * self.patch_len()
    }

    /// Views the kernels as a `[out, in * k * k]` matrix, plus the biases.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (w_raw, b_raw) = params.split_at(self.weight_size());
        let weights = ArrayView2::from_shape((self.out_channels, self.patch_len()), w_raw)?;
        let biases = ArrayView1::from_shape(self.out_channels, b_raw)?;
        Ok((weights, biases))
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let (dw_raw, db_raw) = grad.split_at_mut(self.weight_size());
        let dw = ArrayViewMut2::from_shape((self.out_channels, self.patch_len()), dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.out_channels, db_raw)?;
        Ok((dw, db))
    }
}

/// Lowers a `[c, h, w]` sample to a `[c * k * k, oh * ow]` matrix whose columns are the
/// flattened receptive fields of each output position.
fn im2col(x: ArrayView3<f32>, k: usize) -> Result<Array2<f32>> {
    let (c, h, w) = x.dim();
    let (oh, ow) = (h - k + 1, w - k + 1);
    let mut cols = Array2::zeros((c * k * k, oh * ow));

    for ci in 0..c {
        for ki in 0..k {
            for kj in 0..k {
                let row = (ci * k + ki) * k + kj;
                let patch = x.slice(s![ci, ki..ki + oh, kj..kj + ow]);
                cols.row_mut(row)
                    .into_shape_with_order((oh, ow))?
                    .assign(&patch);
            }
        }
    }

    Ok(cols)
}

/// Scatters a column matrix back onto a `[c, h, w]` sample, adding overlapping contributions.
fn col2im(cols: ArrayView2<f32>, (c, h, w): (usize, usize, usize), k: usize) -> Result<Array3<f32>> {
    let (oh, ow) = (h - k + 1, w - k + 1);
    let mut x = Array3::zeros((c, h, w));

    for ci in 0..c {
        for ki in 0..k {
            for kj in 0..k {
                let row = (ci * k + ki) * k + kj;
                let contribution = cols.row(row).into_shape_with_order((oh, ow))?;
                let mut region = x.slice_mut(s![ci, ki..ki + oh, kj..kj + ow]);
                region += &contribution;
            }
        }
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_matches_direct_convolution() {
        let mut conv = Conv2d::new(1, 1, 2);
        // Kernel [[1, 0], [0, -1]], bias 0.5.
        let params = [1.0, 0.0, 0.0, -1.0, 0.5];
        let x = array![[[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]]];

        let y = conv.forward(&params, x.into_dyn()).unwrap();
        let expected = array![[[[-3.5, -3.5], [-3.5, -3.5]]]];
        assert_eq!(y, expected.into_dyn());
    }

    #[test]
    fn output_shape_shrinks_by_kernel() {
        let mut conv = Conv2d::new(3, 4, 3);
        let params = vec![0.0; conv.size()];
        let y = conv
            .forward(&params, ArrayD::zeros(vec![2, 3, 10, 8]))
            .unwrap();
        assert_eq!(y.shape(), &[2, 4, 8, 6]);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut conv = Conv2d::new(2, 2, 2);
        let x = Array4::from_shape_fn((2, 2, 3, 3), |(a, b, c, d)| {
            ((a * 7 + b * 5 + c * 3 + d) % 11) as f32 / 10.0 - 0.5
        })
        .into_dyn();
        let mut params: Vec<f32> = (0..conv.size())
            .map(|i| ((i * 37) % 17) as f32 / 17.0 - 0.5)
            .collect();

        // loss = sum(y * y) / 2, so dL/dy = y
        let y = conv.forward(&params, x.clone()).unwrap();
        let mut grad = vec![0.0; conv.size()];
        let dx = conv.backward(&params, &mut grad, y).unwrap();

        let loss = |conv: &mut Conv2d, params: &[f32], x: ArrayD<f32>| {
            conv.forward(params, x).unwrap().mapv(|v| v * v).sum() / 2.0
        };

        let eps = 1e-2;
        for i in 0..params.len() {
            let orig = params[i];
            params[i] = orig + eps;
            let up = loss(&mut conv, &params, x.clone());
            params[i] = orig - eps;
            let down = loss(&mut conv, &params, x.clone());
            params[i] = orig;

            assert_abs_diff_eq!(grad[i], (up - down) / (2.0 * eps), epsilon = 1e-2);
        }

        let mut x_shifted = x.clone();
        let idx = [1, 1, 2, 0];
        let orig = x_shifted[idx];
        x_shifted[idx] = orig + eps;
        let up = loss(&mut conv, &params, x_shifted.clone());
        x_shifted[idx] = orig - eps;
        let down = loss(&mut conv, &params, x_shifted);
        assert_abs_diff_eq!(dx[idx], (up - down) / (2.0 * eps), epsilon = 1e-2);
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let mut conv = Conv2d::new(1, 2, 3);
        let params = vec![0.0; conv.size()];
        let err = conv
            .forward(&params, ArrayD::zeros(vec![1, 2, 5, 5]))
            .unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { .. }));
    }
}
