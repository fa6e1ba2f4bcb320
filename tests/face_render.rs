//! Whole-frame rendering through the public API.

use core::convert::Infallible;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use spiral_watch::{
    assets::AssetSet,
    battery::FixedVoltage,
    clock::{FixedTime, WallTime},
    face::{FaceConfig, WatchFace},
    geometry::Vector,
    hand::{HandPose, HAND_POINTS},
    surface::{Framebuffer, Surface},
};

// Framebuffer that refuses pixels written outside a write session and keeps
// count of how sessions open and close.
struct SessionChecked {
    fb: Framebuffer,
    depth: u32,
    opened: u32,
    closed: u32,
}

impl SessionChecked {
    fn new(size: u32) -> Self {
        Self { fb: Framebuffer::new(size, size), depth: 0, opened: 0, closed: 0 }
    }
}

impl OriginDimensions for SessionChecked {
    fn size(&self) -> Size {
        self.fb.size()
    }
}

impl DrawTarget for SessionChecked {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<BinaryColor>>,
    {
        assert!(self.depth > 0, "pixels written outside a write session");
        self.fb.draw_iter(pixels)
    }
}

impl Surface for SessionChecked {
    fn begin_write(&mut self) {
        self.depth += 1;
        self.opened += 1;
    }

    fn end_write(&mut self) {
        assert!(self.depth > 0, "end_write without begin_write");
        self.depth -= 1;
        self.closed += 1;
    }
}

fn render(config: FaceConfig, time: WallTime, volts: f32) -> Framebuffer {
    let assets = AssetSet::generate(&config);
    let face = WatchFace::new(config, assets.textures().unwrap());
    let mut fb = Framebuffer::new(config.surface_size, config.surface_size);
    let drawn = face
        .render(&mut fb, &mut FixedTime(time), &mut FixedVoltage(volts))
        .unwrap();
    assert_eq!(drawn, time);
    fb
}

#[test_log::test]
fn frames_are_deterministic() {
    let a = render(FaceConfig::default(), WallTime::new(10, 8), 4.0);
    let b = render(FaceConfig::default(), WallTime::new(10, 8), 4.0);
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test_log::test]
fn the_spiral_turns_with_the_minute() {
    let a = render(FaceConfig::default(), WallTime::new(10, 8), 4.0);
    let b = render(FaceConfig::default(), WallTime::new(10, 9), 4.0);
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test_log::test]
fn every_write_happens_inside_a_balanced_session() {
    let config = FaceConfig::default();
    let assets = AssetSet::generate(&config);
    let face = WatchFace::new(config, assets.textures().unwrap());

    let mut surface = SessionChecked::new(200);
    face.draw(&mut surface, WallTime::new(7, 23), 0.5).unwrap();

    assert_eq!(surface.depth, 0);
    assert_eq!(surface.opened, surface.closed);
    // one per frame, plus at least one per face, rim and hand triangle
    assert!(surface.opened > 180 * 4, "opened = {}", surface.opened);
}

#[test_log::test]
fn battery_voltage_sets_the_rim() {
    let t = WallTime::new(4, 20);
    let full = render(FaceConfig::default(), t, 4.2);
    let empty = render(FaceConfig::default(), t, 3.5);
    assert_ne!(full.as_bytes(), empty.as_bytes());

    // readings past either end clamp
    assert_eq!(render(FaceConfig::default(), t, 5.0).as_bytes(), full.as_bytes());
    assert_eq!(render(FaceConfig::default(), t, 2.9).as_bytes(), empty.as_bytes());
}

#[test_log::test]
fn panel_sized_frame_uses_the_whole_surface() {
    let fb = render(FaceConfig::for_surface(466), WallTime::new(1, 50), 3.9);
    assert_eq!(fb.width(), 466);

    let lit = fb.count_lit();
    let total = 466 * 466;
    assert!(lit > total / 20 && lit < total - total / 20, "lit = {}", lit);

    // something drawn in every quadrant
    for (qx, qy) in [(0, 0), (233, 0), (0, 233), (233, 233)] {
        let any_lit = (qy..qy + 233).any(|y| {
            (qx..qx + 233).any(|x| fb.pixel(Point::new(x, y)) == Some(BinaryColor::On))
        });
        assert!(any_lit, "quadrant ({}, {}) is blank", qx, qy);
    }
}

#[test_log::test]
fn hands_turn_clockwise_from_twelve() {
    let unit = |angle| HandPose::new(angle, 1.0, Vector::ZERO, 1.0, Vector::ZERO);

    assert_eq!(unit(0.0).points(), HAND_POINTS);

    // a quarter hour points right, half past points down
    let quarter = unit(WallTime::new(0, 15).minute_angle()).points()[0];
    assert!((quarter.x - 1.0).abs() < 1e-5 && quarter.y.abs() < 1e-5, "{:?}", quarter);
    let half = unit(WallTime::new(0, 30).minute_angle()).points()[0];
    assert!(half.x.abs() < 1e-5 && (half.y - 1.0).abs() < 1e-5, "{:?}", half);

    // nine o'clock hour hand points left
    let nine = unit(WallTime::new(21, 0).hour_angle()).points()[0];
    assert!((nine.x + 1.0).abs() < 1e-5 && nine.y.abs() < 1e-5, "{:?}", nine);
}
