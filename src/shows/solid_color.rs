//! The whole strip shines in one color
//!
//! | Parameter      | JSON                                   |
//! |----------------|----------------------------------------|
//! | `color`        | `[r, g, b]`, `0xRRGGBB` or `"#rrggbb"` |
//! | `fadetime_sec` | number, default 2                      |

use crate::color::Rgb;
use crate::driver::LedStrip;
use crate::error::Result;
use crate::params::{preprocess, verify, Parameter, ParameterStore};
use crate::show::{blend_whole_strip_to_color, Show, ShowContext};
use std::time::Duration;

pub struct SolidColor {
    color: Parameter<Option<Rgb>>,
    fadetime_sec: Parameter<f64>,
}

impl SolidColor {
    pub fn new() -> Self {
        Self {
            color: Parameter::new("color", None)
                .verified_by(verify::required_rgb_color)
                .preprocessed_by(preprocess::color_from_wire),
            fadetime_sec: Parameter::new("fadetime_sec", 2.0)
                .verified_by(|v, name| verify::duration_sec(*v, name))
                .preprocessed_by(preprocess::number_from_string),
        }
    }

    pub fn boxed() -> Box<dyn Show> {
        Box::new(Self::new())
    }

    fn fade_in(&self, ctx: &mut ShowContext<'_>) -> Result<()> {
        let Some(color) = *self.color.get() else {
            return Ok(());
        };
        blend_whole_strip_to_color(ctx, color, Duration::from_secs_f64(*self.fadetime_sec.get()))
    }
}

impl Default for SolidColor {
    fn default() -> Self {
        Self::new()
    }
}

impl Show for SolidColor {
    fn name(&self) -> &'static str {
        "solidcolor"
    }

    fn parameters(&mut self) -> ParameterStore<'_> {
        ParameterStore::new()
            .with(&mut self.color)
            .with(&mut self.fadetime_sec)
    }

    fn check_runnable(&self, _strip: &dyn LedStrip) -> Result<()> {
        self.color.verify()?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        self.fade_in(ctx)
    }

    fn parameters_changed(&mut self, ctx: &mut ShowContext<'_>) -> Result<()> {
        self.fade_in(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DummyStrip;
    use crate::error::{ParameterError, StripError};
    use crate::show::CancellationToken;
    use serde_json::json;

    #[test]
    fn test_missing_color_is_not_runnable() {
        let show = SolidColor::new();
        let result = show.check_runnable(&DummyStrip::new(3, 1.0));
        assert!(matches!(
            result,
            Err(StripError::InvalidParameters(ParameterError::Missing(_)))
        ));
    }

    #[test]
    fn test_fills_strip() {
        let mut show = SolidColor::new();
        show.parameters()
            .apply_all(json!({"color": "#00ff00", "fadetime_sec": 0}).as_object().unwrap())
            .unwrap();

        let mut strip = DummyStrip::new(4, 1.0);
        show.check_runnable(&strip).unwrap();
        let mut ctx = ShowContext::detached(&mut strip, CancellationToken::new());
        show.run(&mut ctx).unwrap();

        show.parameters().set("color", &json!([0, 0, 255])).unwrap();
        show.parameters_changed(&mut ctx).unwrap();
        drop(ctx);

        assert!(strip.buffer().colors().iter().all(|c| *c == (0.0, 0.0, 255.0)));
    }
}
