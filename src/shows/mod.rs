//! The shows that ship with ledshows
//!
//! | Name            | Parameters                                       |
//! |-----------------|--------------------------------------------------|
//! | `clear`         | `fadetime_sec`                                   |
//! | `idle`          | -                                                |
//! | `solidcolor`    | `color` (required), `fadetime_sec`               |
//! | `twocolorblend` | `color1`, `color2` (both required)               |
//! | `rainbow`       | `pause_sec`, `num_steps_per_cycle`, `num_cycles` |
//! | `theaterchase`  | `pause_sec`, `num_steps_per_cycle`, `num_cycles` |
//! | `strandtest`    | `pause_sec`, `num_steps_per_cycle`, `num_cycles` |
//! | `starlight`     | `pause_sec`, `num_steps_per_cycle`, `num_cycles` |
//! | `rgbtest`       | `hold_sec`                                       |

pub mod clear;
pub mod idle;
pub mod rainbow;
pub mod solid_color;
pub mod starlight;
pub mod strand_test;
pub mod theater_chase;
pub mod two_color_blend;

pub use clear::Clear;
pub use idle::Idle;
pub use rainbow::Rainbow;
pub use rgb_test::RgbTest;
pub use solid_color::SolidColor;
pub use starlight::Starlight;
pub use strand_test::StrandTest;
pub use theater_chase::TheaterChase;
pub use two_color_blend::TwoColorBlend;

use crate::show::ShowRegistry;

/// Add every show above to `registry`
pub fn register_all(registry: &mut ShowRegistry) {
    registry
        .register("clear", Clear::boxed)
        .register("idle", Idle::boxed)
        .register("solidcolor", SolidColor::boxed)
        .register("twocolorblend", TwoColorBlend::boxed)
        .register("rainbow", Rainbow::boxed)
        .register("theaterchase", TheaterChase::boxed)
        .register("strandtest", StrandTest::boxed)
        .register("starlight", Starlight::boxed)
        .register("rgbtest", RgbTest::boxed);
}
