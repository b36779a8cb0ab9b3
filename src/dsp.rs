//! Shared raster / frequency-domain primitives
//!
//! The frequency, face-swap, intrinsic, and sensor-noise detectors all work
//! on the same handful of operations: grayscale conversion, one 2-D DFT
//! with the DC bin centered, box-filter statistics, and radial profiles.
//! They live here so each detector stays at the altitude of its rules.

use image::RgbImage;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Grayscale raster in row-major f64, channel-mean converted.
#[derive(Debug, Clone)]
pub struct Grayscale {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Grayscale {
    pub fn from_rgb(img: &RgbImage) -> Grayscale {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let mut data = Vec::with_capacity(width * height);
        for pixel in img.pixels() {
            let [r, g, b] = pixel.0;
            data.push((r as f64 + g as f64 + b as f64) / 3.0);
        }
        Grayscale {
            width,
            height,
            data,
        }
    }

    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Rectangular sub-raster, clamped to bounds.
    pub fn crop(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> Grayscale {
        let x2 = x2.min(self.width);
        let y2 = y2.min(self.height);
        let x1 = x1.min(x2);
        let y1 = y1.min(y2);
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1));
        for y in y1..y2 {
            data.extend_from_slice(&self.data[y * self.width + x1..y * self.width + x2]);
        }
        Grayscale {
            width: x2 - x1,
            height: y2 - y1,
            data,
        }
    }
}

/// Centered 2-D spectrum of a grayscale raster.
#[derive(Debug)]
pub struct Spectrum {
    pub width: usize,
    pub height: usize,
    /// |F| with the DC bin at (width/2, height/2).
    pub magnitude: Vec<f64>,
}

impl Spectrum {
    /// Compute the DFT of `gray` and center the DC bin (fftshift).
    pub fn compute(gray: &Grayscale) -> Spectrum {
        let (w, h) = (gray.width, gray.height);
        let mut buffer: Vec<Complex<f64>> =
            gray.data.iter().map(|&v| Complex::new(v, 0.0)).collect();

        let mut planner = FftPlanner::<f64>::new();
        if w > 1 {
            planner.plan_fft_forward(w).process(&mut buffer);
        }
        if h > 1 {
            let mut transposed = transpose(&buffer, w, h);
            planner.plan_fft_forward(h).process(&mut transposed);
            buffer = transpose(&transposed, h, w);
        }

        let mut magnitude = vec![0.0; w * h];
        for y in 0..h {
            let sy = (y + h - h / 2) % h;
            for x in 0..w {
                let sx = (x + w - w / 2) % w;
                magnitude[y * w + x] = buffer[sy * w + sx].norm();
            }
        }

        Spectrum {
            width: w,
            height: h,
            magnitude,
        }
    }

    pub fn center(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }

    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.magnitude[y * self.width + x]
    }

    /// Squared-magnitude energy of every bin.
    pub fn total_energy(&self) -> f64 {
        self.magnitude.iter().map(|m| m * m).sum()
    }

    /// Energy at radial distance strictly greater than `radius` from the
    /// DC bin, as a fraction of the total. Returns None for an all-zero
    /// spectrum.
    pub fn high_frequency_ratio(&self, radius: f64) -> Option<f64> {
        let (cx, cy) = self.center();
        let total = self.total_energy();
        if total <= 0.0 {
            return None;
        }
        let mut outer = 0.0;
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f64 - cx as f64;
                let dy = y as f64 - cy as f64;
                if (dx * dx + dy * dy).sqrt() > radius {
                    let m = self.at(x, y);
                    outer += m * m;
                }
            }
        }
        Some(outer / total)
    }

    /// Radially averaged power spectrum via integer-binned accumulation.
    /// Index r holds the mean power of bins with integer distance r.
    pub fn radial_power_profile(&self) -> Vec<f64> {
        let (cx, cy) = self.center();
        let max_radius = cx.min(cy);
        let mut sums = vec![0.0; max_radius + 2];
        let mut counts = vec![0u32; max_radius + 2];

        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f64 - cx as f64;
                let dy = y as f64 - cy as f64;
                let r = (dx * dx + dy * dy).sqrt() as usize;
                if r < sums.len() {
                    let m = self.at(x, y);
                    sums[r] += m * m;
                    counts[r] += 1;
                }
            }
        }

        sums.iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
            .collect()
    }
}

fn transpose(data: &[Complex<f64>], w: usize, h: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..h {
        for x in 0..w {
            out[x * h + y] = data[y * w + x];
        }
    }
    out
}

/// Normalized autocorrelation of a real signal at one lag:
/// sum(x[i] * x[i+lag]) / sum(x[i]^2).
pub fn autocorrelation_at(signal: &[f64], lag: usize) -> f64 {
    if signal.len() <= lag {
        return 0.0;
    }
    let zero_lag: f64 = signal.iter().map(|v| v * v).sum();
    if zero_lag <= 0.0 {
        return 0.0;
    }
    let shifted: f64 = signal[..signal.len() - lag]
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| a * b)
        .sum();
    shifted / zero_lag
}

/// Least-squares slope of y over x.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x: f64 = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y: f64 = ys[..n].iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        num += dx * (ys[i] - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Box-filtered local mean over a `size` x `size` window (reflect-free:
/// windows shrink at the borders), computed with an integral image.
pub fn box_mean(gray: &Grayscale, size: usize) -> Vec<f64> {
    let (w, h) = (gray.width, gray.height);
    let half = size / 2;
    let integral = integral_image(&gray.data, w, h);

    let mut out = vec![0.0; w * h];
    for y in 0..h {
        let y1 = y.saturating_sub(half);
        let y2 = (y + half + 1).min(h);
        for x in 0..w {
            let x1 = x.saturating_sub(half);
            let x2 = (x + half + 1).min(w);
            let area = ((x2 - x1) * (y2 - y1)) as f64;
            out[y * w + x] = window_sum(&integral, w, x1, y1, x2, y2) / area;
        }
    }
    out
}

/// Mean local variance over `size` x `size` windows:
/// E[x^2] - E[x]^2 per window, averaged over the raster.
pub fn mean_local_variance(gray: &Grayscale, size: usize) -> f64 {
    let (w, h) = (gray.width, gray.height);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let half = size / 2;
    let integral = integral_image(&gray.data, w, h);
    let squares: Vec<f64> = gray.data.iter().map(|v| v * v).collect();
    let integral_sq = integral_image(&squares, w, h);

    let mut total = 0.0;
    for y in 0..h {
        let y1 = y.saturating_sub(half);
        let y2 = (y + half + 1).min(h);
        for x in 0..w {
            let x1 = x.saturating_sub(half);
            let x2 = (x + half + 1).min(w);
            let area = ((x2 - x1) * (y2 - y1)) as f64;
            let mean = window_sum(&integral, w, x1, y1, x2, y2) / area;
            let mean_sq = window_sum(&integral_sq, w, x1, y1, x2, y2) / area;
            total += (mean_sq - mean * mean).max(0.0);
        }
    }
    total / (w * h) as f64
}

fn integral_image(data: &[f64], w: usize, h: usize) -> Vec<f64> {
    // (w+1) x (h+1) with a zero border row/column.
    let stride = w + 1;
    let mut integral = vec![0.0; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0.0;
        for x in 0..w {
            row_sum += data[y * w + x];
            integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
        }
    }
    integral
}

fn window_sum(integral: &[f64], w: usize, x1: usize, y1: usize, x2: usize, y2: usize) -> f64 {
    let stride = w + 1;
    integral[y2 * stride + x2] - integral[y1 * stride + x2] - integral[y2 * stride + x1]
        + integral[y1 * stride + x1]
}

/// Mean of a slice; 0.0 when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Population variance of a slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Pearson correlation of two equal-length samples.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = mean(&a[..n]);
    let mean_b = mean(&b[..n]);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Saturation channel in [0, 255], matching the HSV conversion the
/// saturation thresholds were calibrated against: S = 255 * (max-min)/max.
pub fn saturation_channel(img: &RgbImage) -> Vec<f64> {
    img.pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            let max = r.max(g).max(b) as f64;
            let min = r.min(g).min(b) as f64;
            if max <= 0.0 {
                0.0
            } else {
                255.0 * (max - min) / max
            }
        })
        .collect()
}
