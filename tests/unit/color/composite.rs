use super::*;

#[test]
fn output_takes_guide_dimensions() {
    let guide = Frame::solid(64, 32, [120, 120, 120, 255]);
    let color = Frame::solid(16, 8, [40, 90, 160, 255]);
    let out = composite(&guide, &color, 0.5).unwrap();
    assert_eq!(out.dimensions(), (64, 32));
    assert!(out.as_image().pixels().all(|p| p[3] == 255));
}

#[test]
fn alpha_zero_reproduces_the_color_frame() {
    let guide = Frame::solid(8, 8, [250, 250, 250, 255]);
    let color = Frame::solid(8, 8, [60, 110, 170, 255]);
    let out = composite(&guide, &color, 0.0).unwrap();
    for p in out.as_image().pixels() {
        for (c, want) in [60u8, 110, 170].into_iter().enumerate() {
            assert!((i16::from(p[c]) - i16::from(want)).abs() <= 1, "{p:?}");
        }
    }
}

#[test]
fn alpha_one_of_gray_guide_keeps_guide_lightness() {
    let guide = Frame::solid(4, 4, [90, 90, 90, 255]);
    let color = Frame::solid(2, 2, [128, 128, 128, 255]);
    let out = composite(&guide, &color, 1.0).unwrap();
    for p in out.as_image().pixels() {
        for c in 0..3 {
            assert!((i16::from(p[c]) - 90).abs() <= 1, "{p:?}");
        }
    }
}

#[test]
fn upsampling_keeps_solid_chroma_flat() {
    let guide = Frame::solid(40, 40, [128, 128, 128, 255]);
    let color = Frame::solid(5, 5, [180, 80, 60, 255]);
    let out = composite(&guide, &color, 0.3).unwrap();
    let first = *out.as_image().get_pixel(0, 0);
    for p in out.as_image().pixels() {
        for c in 0..3 {
            assert!((i16::from(p[c]) - i16::from(first[c])).abs() <= 1, "{p:?}");
        }
    }
}

#[test]
fn rejects_aspect_mismatch_and_empty_frames() {
    let guide = Frame::solid(64, 64, [0, 0, 0, 255]);
    assert!(matches!(
        composite(&guide, &Frame::solid(16, 8, [0, 0, 0, 255]), 0.5),
        Err(DaylapseError::InvalidFrame(_))
    ));
    assert!(matches!(
        composite(&guide, &Frame::solid(0, 0, [0, 0, 0, 255]), 0.5),
        Err(DaylapseError::InvalidFrame(_))
    ));
}

#[test]
fn rejects_alpha_out_of_range() {
    let f = Frame::solid(4, 4, [0, 0, 0, 255]);
    for alpha in [-0.1, 1.1, f32::NAN] {
        assert!(matches!(
            composite(&f, &f, alpha),
            Err(DaylapseError::Validation(_))
        ));
    }
}

#[test]
fn composite_is_deterministic() {
    let guide = Frame::from_image(image::RgbaImage::from_fn(32, 32, |x, y| {
        image::Rgba([(x * 8) as u8, (y * 8) as u8, 100, 255])
    }));
    let color = Frame::from_image(image::RgbaImage::from_fn(8, 8, |x, y| {
        image::Rgba([200, (x * 30) as u8, (y * 30) as u8, 255])
    }));
    let a = composite(&guide, &color, 0.5).unwrap();
    let b = composite(&guide, &color, 0.5).unwrap();
    assert_eq!(a, b);
}
