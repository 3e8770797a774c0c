//! Helpers over the flat row-major tensors produced by the model.

use ndarray::prelude::*;

use crate::error::Error;

/// Value of a tensor at a fractional position: a scalar for `H×W` tensors,
/// one value per channel for `H×W×C` tensors.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Scalar(f32),
    Channels(Vec<f32>),
}

/// Flat index of `(row, col)` in a row-major `[height, width]` tensor.
#[inline(always)]
pub fn index_2d(row: usize, col: usize, dims: [usize; 2]) -> usize {
    row * dims[1] + col
}

/// Flat index of `(row, col, channel)` in a row-major
/// `[height, width, channels]` tensor.
#[inline(always)]
pub fn index_3d(row: usize, col: usize, channel: usize, dims: [usize; 3]) -> usize {
    row * dims[1] * dims[2] + col * dims[2] + channel
}

/// Indices of `values` sorted ascending by value. Values below `threshold`
/// are left out. The sort is stable, so equal values keep their index order.
pub fn argsort_threshold<'a, I>(values: I, threshold: Option<f32>) -> Vec<usize>
where
    I: IntoIterator<Item = &'a f32>,
{
    let mut pairs: Vec<(usize, f32)> = values
        .into_iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| match threshold {
            Some(t) => v >= t,
            None => !v.is_nan(),
        })
        .collect();

    pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
    pairs.into_iter().map(|(idx, _)| idx).collect()
}

/// Wraps a flat slice as a `[height, width]` view.
pub fn view_2d<'a>(
    name: &'static str,
    data: &'a [f32],
    (height, width): (usize, usize),
) -> Result<ArrayView2<'a, f32>, Error> {
    check_len(name, data, height * width)?;

    Ok(ArrayView2::from_shape((height, width), data)?)
}

/// Wraps a flat slice as a `[height, width, channels]` view.
pub fn view_3d<'a>(
    name: &'static str,
    data: &'a [f32],
    (height, width): (usize, usize),
    channels: usize,
) -> Result<ArrayView3<'a, f32>, Error> {
    check_len(name, data, height * width * channels)?;

    Ok(ArrayView3::from_shape((height, width, channels), data)?)
}

#[inline]
fn check_len(name: &'static str, data: &[f32], expected: usize) -> Result<(), Error> {
    if data.len() != expected {
        return Err(Error::TensorSize {
            name,
            expected,
            actual: data.len(),
        });
    }

    Ok(())
}

/// Corner cells and weights of a bilinear lookup.
#[derive(Debug, Clone, Copy)]
struct Bilinear {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    w00: f32,
    w01: f32,
    w10: f32,
    w11: f32,
}

impl Bilinear {
    // `(x, y)` is in model input pixels, the grid is `height x width` cells
    fn new(x: f32, y: f32, stride: f32, height: usize, width: usize) -> Self {
        let scale = 1.0 / stride;
        let (xr, yr) = (x * scale, y * scale);

        let fx0 = xr.floor();
        let fy0 = yr.floor();
        let fx1 = if fx0 == xr { fx0 } else { fx0 + 1.0 };
        let fy1 = if fy0 == yr { fy0 } else { fy0 + 1.0 };

        let xlerp = fx0 + 1.0 - xr;
        let ylerp = fy0 + 1.0 - yr;

        let clamp = |v: f32, len: usize| (v.max(0.0) as usize).min(len.saturating_sub(1));

        Self {
            x0: clamp(fx0, width),
            x1: clamp(fx1, width),
            y0: clamp(fy0, height),
            y1: clamp(fy1, height),
            w00: xlerp * ylerp,
            w01: xlerp * (1.0 - ylerp),
            w10: (1.0 - xlerp) * ylerp,
            w11: (1.0 - xlerp) * (1.0 - ylerp),
        }
    }

    #[inline]
    fn blend<G: Fn(usize, usize) -> f32>(&self, at: G) -> f32 {
        self.w00 * at(self.y0, self.x0)
            + self.w01 * at(self.y1, self.x0)
            + self.w10 * at(self.y0, self.x1)
            + self.w11 * at(self.y1, self.x1)
    }
}

/// Bilinearly samples a `[height, width]` tensor at input-pixel position
/// `(x, y)`, which is scaled by `1 / stride` onto the tensor grid. Positions
/// past the last cell reuse the border cell.
pub fn sample_2d(tensor: &ArrayView2<'_, f32>, x: f32, y: f32, stride: f32) -> f32 {
    let (height, width) = tensor.dim();
    let b = Bilinear::new(x, y, stride, height, width);

    b.blend(|r, c| tensor[[r, c]])
}

/// Bilinearly samples every channel of a `[height, width, channels]` tensor.
pub fn sample_3d(tensor: &ArrayView3<'_, f32>, x: f32, y: f32, stride: f32) -> Vec<f32> {
    let (height, width, channels) = tensor.dim();
    let b = Bilinear::new(x, y, stride, height, width);

    (0..channels)
        .map(|k| b.blend(|r, c| tensor[[r, c, k]]))
        .collect()
}

/// Rank-dispatching sampler. Only rank 2 and rank 3 tensors are supported;
/// anything else is a caller error.
pub fn sample(tensor: &ArrayViewD<'_, f32>, x: f32, y: f32, stride: f32) -> Result<Sample, Error> {
    if tensor.is_empty() {
        return Err(Error::InvalidDimensions(format!(
            "cannot sample empty tensor of shape {:?}",
            tensor.shape()
        )));
    }

    match tensor.ndim() {
        2 => {
            let view = tensor.view().into_dimensionality::<Ix2>()?;
            Ok(Sample::Scalar(sample_2d(&view, x, y, stride)))
        }
        3 => {
            let view = tensor.view().into_dimensionality::<Ix3>()?;
            Ok(Sample::Channels(sample_3d(&view, x, y, stride)))
        }
        rank => Err(Error::UnsupportedRank(rank)),
    }
}
