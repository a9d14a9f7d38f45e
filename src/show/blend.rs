//! Smooth transitions from the current strip state to a target state

use super::ShowContext;
use crate::color::{add_tuples, linear_dim, Rgb, BLACK};
use crate::error::Result;
use crate::params::verify;
use std::time::{Duration, Instant};

/// Upper bound of the frame rate during a blend
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// How the start color gives way to the end color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendFunction {
    #[default]
    Linear,
    Parabolic,
    Cubic,
}

impl BlendFunction {
    pub fn power(self) -> i32 {
        match self {
            BlendFunction::Linear => 1,
            BlendFunction::Parabolic => 2,
            BlendFunction::Cubic => 3,
        }
    }

    /// `remaining` runs from 1.0 (all start color) to 0.0 (all end color)
    pub fn apply(self, start: Rgb, end: Rgb, remaining: f32) -> Rgb {
        power_blend(self.power(), start, end, remaining)
    }
}

/// Blend two colors with weights `remaining^power` and `(1 - remaining)^power`
pub fn power_blend(power: i32, start: Rgb, end: Rgb, remaining: f32) -> Rgb {
    let start_component = linear_dim(start, remaining.powi(power));
    let end_component = linear_dim(end, (1.0 - remaining).powi(power));
    add_tuples(start_component, end_component)
}

/// Target colors for a transition of the whole strip
#[derive(Debug, Clone)]
pub struct SmoothBlend {
    target_colors: Vec<Rgb>,
}

impl SmoothBlend {
    pub fn new(num_leds: usize) -> Self {
        Self {
            target_colors: vec![BLACK; num_leds],
        }
    }

    /// Target of one pixel; invalid colors are logged and clamped by the driver
    pub fn set_pixel(&mut self, index: usize, red: f32, green: f32, blue: f32) {
        if let Err(e) = verify::rgb_color(&(red, green, blue), "target color") {
            tracing::error!("{}", e);
        }
        if let Some(target) = self.target_colors.get_mut(index) {
            *target = (red, green, blue);
        }
    }

    pub fn set_color_for_whole_strip(&mut self, red: f32, green: f32, blue: f32) {
        for index in 0..self.target_colors.len() {
            self.set_pixel(index, red, green, blue);
        }
    }

    pub fn target_colors(&self) -> &[Rgb] {
        &self.target_colors
    }

    /// Blend the strip from its current colors to the targets within `duration`
    ///
    /// The final frame is written after the loop, so the loop stops early
    /// enough to leave one refresh time for it.
    pub fn blend(
        &self,
        ctx: &mut ShowContext<'_>,
        duration: Duration,
        function: BlendFunction,
    ) -> Result<()> {
        let num_leds = ctx.num_leds().min(self.target_colors.len());
        let initial: Vec<Rgb> = (0..num_leds)
            .map(|index| ctx.strip().get_pixel(index).unwrap_or(BLACK))
            .collect();

        let reserve = ctx.max_refresh_time();
        let end_time = Instant::now() + duration;

        loop {
            let now = Instant::now();
            if now + reserve >= end_time {
                break;
            }
            let remaining = (end_time - now).as_secs_f32() / duration.as_secs_f32();

            let strip = ctx.strip();
            for (index, (start, end)) in initial.iter().zip(&self.target_colors).enumerate() {
                let (r, g, b) = function.apply(*start, *end, remaining);
                strip.set_pixel(index, r, g, b);
            }
            ctx.show()?;
            ctx.sleep(FRAME_INTERVAL.min(end_time.saturating_duration_since(Instant::now())))?;
        }

        let strip = ctx.strip();
        for (index, (r, g, b)) in self.target_colors.iter().enumerate() {
            strip.set_pixel(index, *r, *g, *b);
        }
        ctx.show()
    }
}

/// Blend every pixel to `color` within `fadetime`
pub fn blend_whole_strip_to_color(ctx: &mut ShowContext<'_>, color: Rgb, fadetime: Duration) -> Result<()> {
    let mut transition = SmoothBlend::new(ctx.num_leds());
    transition.set_color_for_whole_strip(color.0, color.1, color.2);
    transition.blend(ctx, fadetime, BlendFunction::Linear)
}
