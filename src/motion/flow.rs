//! Dense optical flow (pyramidal Lucas-Kanade).
//!
//! Every pixel gets a displacement estimate by solving the 2x2 Lucas-Kanade
//! system over a square window. Window sums come from summed-area tables so
//! the cost per pyramid level is linear in the pixel count regardless of
//! window size. Coarse levels seed finer ones, which lets the estimator follow
//! displacements larger than the window.

use glam::Vec2;
use image::GrayImage;

/// Pyramid levels smaller than this (either side) are not built
const MIN_LEVEL_SIDE: usize = 16;

/// Minimum structure-tensor eigenvalue per window pixel for a solvable window
const MIN_EIGEN_PER_PIXEL: f64 = 0.5;

/// Single-channel f32 image plane
#[derive(Debug, Clone)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn from_gray(image: &GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Bilinear sample with edge clamping
    fn sample(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Half-resolution plane by 2x2 box averaging
    fn downsample(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = Self::filled(width, height, 0.0);
        for y in 0..height {
            for x in 0..width {
                let sx = (2 * x).min(self.width - 1);
                let sy = (2 * y).min(self.height - 1);
                let sx1 = (sx + 1).min(self.width - 1);
                let sy1 = (sy + 1).min(self.height - 1);
                out.data[y * width + x] =
                    0.25 * (self.at(sx, sy) + self.at(sx1, sy) + self.at(sx, sy1) + self.at(sx1, sy1));
            }
        }
        out
    }

    /// Central-difference gradients (forward/backward at the borders)
    fn gradients(&self) -> (Plane, Plane) {
        let mut gx = Self::filled(self.width, self.height, 0.0);
        let mut gy = Self::filled(self.width, self.height, 0.0);
        for y in 0..self.height {
            let ym = y.saturating_sub(1);
            let yp = (y + 1).min(self.height - 1);
            for x in 0..self.width {
                let xm = x.saturating_sub(1);
                let xp = (x + 1).min(self.width - 1);
                let dx = (xp - xm).max(1) as f32;
                let dy = (yp - ym).max(1) as f32;
                gx.data[y * self.width + x] = (self.at(xp, y) - self.at(xm, y)) / dx;
                gy.data[y * self.width + x] = (self.at(x, yp) - self.at(x, ym)) / dy;
            }
        }
        (gx, gy)
    }
}

/// Summed-area table for O(1) window sums
struct Integral {
    width: usize,
    height: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn from_fn(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self {
            width,
            height,
            sums,
        }
    }

    /// Sum over the window of `radius` around (x, y), clipped to the image
    fn window(&self, x: usize, y: usize, radius: usize) -> f64 {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        let y1 = (y + radius + 1).min(self.height);
        let stride = self.width + 1;
        self.sums[y1 * stride + x1] - self.sums[y0 * stride + x1] - self.sums[y1 * stride + x0]
            + self.sums[y0 * stride + x0]
    }

    fn window_area(&self, x: usize, y: usize, radius: usize) -> f64 {
        let w = (x + radius + 1).min(self.width) - x.saturating_sub(radius);
        let h = (y + radius + 1).min(self.height) - y.saturating_sub(radius);
        (w * h) as f64
    }
}

/// Per-pixel displacement field (pixels per frame)
#[derive(Debug, Clone)]
pub struct FlowField {
    width: usize,
    height: usize,
    vectors: Vec<Vec2>,
}

impl FlowField {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Displacement at (x, y)
    pub fn get(&self, x: usize, y: usize) -> Vec2 {
        self.vectors[y * self.width + x]
    }

    /// Mean vector magnitude; 0 for an empty or non-finite field
    pub fn mean_magnitude(&self) -> f32 {
        if self.vectors.is_empty() {
            return 0.0;
        }
        let total: f64 = self.vectors.iter().map(|v| v.length() as f64).sum();
        let mean = (total / self.vectors.len() as f64) as f32;
        if mean.is_finite() {
            mean
        } else {
            0.0
        }
    }
}

/// Pyramidal dense Lucas-Kanade estimator
#[derive(Debug, Clone)]
pub struct FlowEstimator {
    levels: usize,
    radius: usize,
    iterations: usize,
}

impl FlowEstimator {
    pub fn new(levels: usize, radius: usize, iterations: usize) -> Self {
        Self {
            levels: levels.max(1),
            radius: radius.max(1),
            iterations: iterations.max(1),
        }
    }

    /// Estimate flow from `prev` to `curr` (both the same size)
    pub fn estimate(&self, prev: &GrayImage, curr: &GrayImage) -> FlowField {
        let prev_pyramid = self.pyramid(Plane::from_gray(prev));
        let curr_pyramid = self.pyramid(Plane::from_gray(curr));

        let mut flow: Option<FlowField> = None;
        for (p, c) in prev_pyramid.iter().zip(&curr_pyramid).rev() {
            let seed = match flow.take() {
                Some(coarse) => upsample(&coarse, p.width, p.height),
                None => vec![Vec2::ZERO; p.width * p.height],
            };
            flow = Some(self.refine_level(p, c, seed));
        }

        flow.unwrap_or(FlowField {
            width: 0,
            height: 0,
            vectors: Vec::new(),
        })
    }

    fn pyramid(&self, base: Plane) -> Vec<Plane> {
        let mut levels = vec![base];
        while levels.len() < self.levels {
            let last = &levels[levels.len() - 1];
            if last.width / 2 < MIN_LEVEL_SIDE || last.height / 2 < MIN_LEVEL_SIDE {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }
        levels
    }

    fn refine_level(&self, prev: &Plane, curr: &Plane, mut vectors: Vec<Vec2>) -> FlowField {
        let (width, height) = (prev.width, prev.height);
        let (gx, gy) = prev.gradients();

        let sxx = Integral::from_fn(width, height, |i| (gx.data[i] * gx.data[i]) as f64);
        let sxy = Integral::from_fn(width, height, |i| (gx.data[i] * gy.data[i]) as f64);
        let syy = Integral::from_fn(width, height, |i| (gy.data[i] * gy.data[i]) as f64);

        let max_step = self.radius as f32;
        let mut mismatch = Plane::filled(width, height, 0.0);

        for _ in 0..self.iterations {
            for y in 0..height {
                for x in 0..width {
                    let i = y * width + x;
                    let d = vectors[i];
                    mismatch.data[i] = curr.sample(x as f32 + d.x, y as f32 + d.y) - prev.at(x, y);
                }
            }

            let bx = Integral::from_fn(width, height, |i| (gx.data[i] * mismatch.data[i]) as f64);
            let by = Integral::from_fn(width, height, |i| (gy.data[i] * mismatch.data[i]) as f64);

            for y in 0..height {
                for x in 0..width {
                    let a = sxx.window(x, y, self.radius);
                    let b = sxy.window(x, y, self.radius);
                    let c = syy.window(x, y, self.radius);

                    // Smallest eigenvalue of [[a, b], [b, c]]
                    let half_trace = 0.5 * (a + c);
                    let spread = (0.25 * (a - c) * (a - c) + b * b).sqrt();
                    let min_eigen = half_trace - spread;
                    let area = sxx.window_area(x, y, self.radius);
                    if min_eigen < MIN_EIGEN_PER_PIXEL * area {
                        continue;
                    }

                    let p = bx.window(x, y, self.radius);
                    let q = by.window(x, y, self.radius);
                    let det = a * c - b * b;
                    let du = ((-c * p + b * q) / det) as f32;
                    let dv = ((b * p - a * q) / det) as f32;
                    if !du.is_finite() || !dv.is_finite() {
                        continue;
                    }

                    let step = Vec2::new(du, dv).clamp_length_max(max_step);
                    vectors[y * width + x] += step;
                }
            }
        }

        FlowField {
            width,
            height,
            vectors,
        }
    }
}

/// Double a coarse field onto a finer grid (nearest neighbour, vectors x2)
fn upsample(coarse: &FlowField, width: usize, height: usize) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let cy = (y / 2).min(coarse.height - 1);
        for x in 0..width {
            let cx = (x / 2).min(coarse.width - 1);
            out.push(coarse.get(cx, cy) * 2.0);
        }
    }
    out
}
