use super::*;

fn mean_rgb(f: &Frame) -> [f32; 3] {
    let mut acc = [0.0f32; 3];
    let n = (f.width() * f.height()) as f32;
    for p in f.as_image().pixels() {
        for c in 0..3 {
            acc[c] += f32::from(p[c]);
        }
    }
    acc.map(|v| v / n)
}

#[test]
fn output_dims_are_exact_reductions() {
    let g = GradeGenerator::new(128);
    assert_eq!(g.output_dims(512, 512), (128, 128));
    assert_eq!(g.output_dims(100, 100), (100, 100));
    assert_eq!(g.output_dims(640, 480), (128, 96));
    // Coprime sides cannot be reduced exactly.
    assert_eq!(g.output_dims(301, 300), (301, 300));
}

#[test]
fn noon_is_brighter_than_midnight() {
    let guide = Frame::solid(64, 64, [150, 150, 150, 255]);
    let mut g = GradeGenerator::new(16);
    let noon = g.infer(&guide, &[], 0.5).unwrap();
    let night = g.infer(&guide, &[], 0.0).unwrap();
    assert_eq!(noon.dimensions(), (16, 16));
    let n = mean_rgb(&noon);
    let m = mean_rgb(&night);
    assert!(n.iter().sum::<f32>() > m.iter().sum::<f32>() + 60.0);
    // Night light is blue.
    assert!(m[2] > m[0]);
}

#[test]
fn sunset_is_warm() {
    let guide = Frame::solid(8, 8, [150, 150, 150, 255]);
    let mut g = GradeGenerator::new(8);
    let f = g.infer(&guide, &[], 18.0 / 24.0).unwrap();
    let m = mean_rgb(&f);
    assert!(m[0] > m[2] + 40.0, "{m:?}");
}

#[test]
fn latent_changes_output_deterministically() {
    let guide = Frame::solid(8, 8, [120, 120, 120, 255]);
    let mut g = GradeGenerator::new(8);
    let a = crate::LatentNoise::gaussian(1, 128);
    let b = crate::LatentNoise::gaussian(2, 128);
    let fa = g.infer(&guide, a.as_slice(), 0.4).unwrap();
    let fa2 = g.infer(&guide, a.as_slice(), 0.4).unwrap();
    let fb = g.infer(&guide, b.as_slice(), 0.4).unwrap();
    assert_eq!(fa, fa2);
    assert_ne!(fa, fb);
}

#[test]
fn empty_guide_is_an_inference_failure() {
    let mut g = GradeGenerator::default();
    assert!(g.infer(&Frame::solid(0, 0, [0; 4]), &[], 0.5).is_err());
    assert!(
        g.infer(&Frame::solid(4, 4, [0, 0, 0, 255]), &[], f32::NAN)
            .is_err()
    );
}
