//! Adaptive per-pixel background model.
//!
//! Each pixel keeps up to `max_modes` Gaussians over its grayscale
//! intensity, ordered by weight. A sample that matches one of the heaviest
//! modes (those whose cumulative weight first reaches `background_ratio`)
//! is background; anything else is foreground. Every sample also updates
//! the model, so stationary objects fade into the background over roughly
//! `history` frames while fresh motion stands out.

use crate::GrayFrame;

/// Mask value for foreground pixels.
pub const FOREGROUND: u8 = 255;

/// Tuning for [`MixtureBackground`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundParams {
    /// Gaussians kept per pixel
    pub max_modes: usize,
    /// Frames over which the model adapts (learning rate = 1 / history)
    pub history: u32,
    /// Squared Mahalanobis distance under which a sample matches a mode
    pub var_threshold: f32,
    /// Cumulative weight of the modes that count as background
    pub background_ratio: f32,
    /// Variance assigned to a freshly created mode
    pub var_init: f32,
    /// Lower variance bound
    pub var_min: f32,
    /// Upper variance bound
    pub var_max: f32,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            max_modes: 3,
            history: 500,
            var_threshold: 16.0,
            background_ratio: 0.9,
            var_init: 15.0,
            var_min: 4.0,
            var_max: 75.0,
        }
    }
}

impl BackgroundParams {
    /// Per-frame learning rate.
    #[inline]
    pub fn learning_rate(&self) -> f32 {
        1.0 / self.history.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    weight: f32,
    mean: f32,
    var: f32,
}

/// Mixture-of-Gaussians background subtractor.
#[derive(Debug, Clone)]
pub struct MixtureBackground {
    params: BackgroundParams,
    width: u32,
    height: u32,
    /// `max_modes` slots per pixel, row-major
    modes: Vec<Mode>,
    /// Slots in use per pixel
    used: Vec<u8>,
    frames_seen: u64,
}

impl MixtureBackground {
    pub fn new(params: BackgroundParams) -> Self {
        Self {
            params: BackgroundParams {
                max_modes: params.max_modes.clamp(1, u8::MAX as usize),
                ..params
            },
            width: 0,
            height: 0,
            modes: Vec::new(),
            used: Vec::new(),
            frames_seen: 0,
        }
    }

    /// Frames folded into the model since it was last seeded.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn is_initialized(&self) -> bool {
        self.frames_seen > 0
    }

    /// Fold `frame` into the model and return its foreground mask.
    ///
    /// The first frame (or the first after a size change) seeds the model
    /// and is reported as all background.
    pub fn apply(&mut self, frame: &GrayFrame) -> GrayFrame {
        let (width, height) = frame.dimensions();
        if !self.is_initialized() || (width, height) != (self.width, self.height) {
            self.seed(frame);
            return GrayFrame::new(width, height);
        }

        let k = self.params.max_modes;
        let alpha = self.params.learning_rate();
        let mut mask = GrayFrame::new(width, height);

        for (idx, (pixel, out)) in frame.pixels().zip(mask.pixels_mut()).enumerate() {
            let slots = &mut self.modes[idx * k..(idx + 1) * k];
            let (foreground, used) = update_pixel(
                slots,
                self.used[idx] as usize,
                pixel.0[0] as f32,
                alpha,
                &self.params,
            );
            self.used[idx] = used as u8;
            if foreground {
                out.0[0] = FOREGROUND;
            }
        }

        self.frames_seen += 1;
        mask
    }

    fn seed(&mut self, frame: &GrayFrame) {
        let (width, height) = frame.dimensions();
        let k = self.params.max_modes;
        let pixels = (width * height) as usize;

        self.width = width;
        self.height = height;
        self.modes = vec![Mode::default(); pixels * k];
        self.used = vec![1; pixels];
        for (idx, pixel) in frame.pixels().enumerate() {
            self.modes[idx * k] = Mode {
                weight: 1.0,
                mean: pixel.0[0] as f32,
                var: self.params.var_init,
            };
        }
        self.frames_seen = 1;
    }
}

/// Update one pixel's modes with sample `x`. Returns (is_foreground, modes_in_use).
fn update_pixel(
    modes: &mut [Mode],
    used: usize,
    x: f32,
    alpha: f32,
    params: &BackgroundParams,
) -> (bool, usize) {
    let matched = modes[..used].iter().position(|m| {
        let d = x - m.mean;
        d * d < params.var_threshold * m.var
    });

    let background = match matched {
        Some(i) => modes[..i].iter().map(|m| m.weight).sum::<f32>() < params.background_ratio,
        None => false,
    };

    for mode in &mut modes[..used] {
        mode.weight *= 1.0 - alpha;
    }

    let (slot, used) = match matched {
        Some(i) => {
            let mode = &mut modes[i];
            mode.weight += alpha;
            let rho = (alpha / mode.weight).min(1.0);
            let d = x - mode.mean;
            mode.mean += rho * d;
            mode.var = (mode.var + rho * (d * d - mode.var)).clamp(params.var_min, params.var_max);
            (i, used)
        }
        None => {
            // Replace the lightest mode once all slots are taken
            let slot = used.min(modes.len() - 1);
            modes[slot] = Mode {
                weight: alpha,
                mean: x,
                var: params.var_init,
            };
            (slot, used.max(slot + 1))
        }
    };

    let total: f32 = modes[..used].iter().map(|m| m.weight).sum();
    if total > 0.0 {
        for mode in &mut modes[..used] {
            mode.weight /= total;
        }
    }

    // Only `slot` changed relative to the others
    let mut i = slot;
    while i > 0 && modes[i].weight > modes[i - 1].weight {
        modes.swap(i, i - 1);
        i -= 1;
    }

    (!background, used)
}
