use super::*;
use crate::inference::generator::InferenceFailure;
use crate::inference::grade::GradeGenerator;

/// Fails on the listed call numbers, otherwise returns a flat color at the guide's aspect.
struct Flaky {
    calls: usize,
    fail_on: Vec<usize>,
    seen_times: Vec<f32>,
}

impl Flaky {
    fn new(fail_on: Vec<usize>) -> Self {
        Self {
            calls: 0,
            fail_on,
            seen_times: Vec::new(),
        }
    }
}

impl FrameGenerator for Flaky {
    fn infer(
        &mut self,
        guide: &Frame,
        latent: &[f32],
        model_time: f32,
    ) -> Result<Frame, InferenceFailure> {
        let call = self.calls;
        self.calls += 1;
        self.seen_times.push(model_time);
        assert_eq!(latent.len(), 16);
        if self.fail_on.contains(&call) {
            return Err(InferenceFailure::new(format!("call {call}")));
        }
        Ok(Frame::solid(
            guide.width() / 2,
            guide.height() / 2,
            [200, 80, 40, 255],
        ))
    }
}

fn cfg() -> PipelineConfig {
    PipelineConfig {
        latent_dim: 16,
        ..PipelineConfig::default()
    }
}

fn request(frames: usize) -> TimelapseRequest {
    TimelapseRequest {
        frame_count: frames,
        start_hour: 6,
        end_hour: 18,
        ..TimelapseRequest::default()
    }
}

#[test]
fn frames_follow_the_schedule() {
    let guide = Frame::solid(8, 8, [120, 120, 120, 255]);
    let mut generator = Flaky::new(vec![]);
    let report = generate_frames(
        &guide,
        &request(3),
        &mut generator,
        &cfg(),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(report.requested, 3);
    assert_eq!(report.produced(), 3);
    assert!(report.skipped.is_empty());
    let hours: Vec<u8> = report.frames.iter().map(|f| f.hour).collect();
    assert_eq!(hours, vec![6, 12, 18]);
    assert_eq!(report.frames[0].time_label(), "dawn (06:00)");
    assert_eq!(report.frames[2].time_of_day, TimeOfDay::Sunset);
    assert!((generator.seen_times[1] - 0.5).abs() < 1e-6);
    for f in &report.frames {
        assert_eq!(f.frame.dimensions(), (8, 8));
    }
}

#[test]
fn failed_inference_skips_the_frame() {
    let guide = Frame::solid(8, 8, [120, 120, 120, 255]);
    let mut generator = Flaky::new(vec![1]);
    let report = generate_frames(
        &guide,
        &request(4),
        &mut generator,
        &cfg(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(report.produced(), 3);
    assert_eq!(report.skipped, vec![1]);
    let indices: Vec<usize> = report.frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 2, 3]);
}

#[test]
fn strict_requests_report_the_shortfall() {
    let guide = Frame::solid(8, 8, [120, 120, 120, 255]);
    let mut generator = Flaky::new(vec![0, 2]);
    let req = TimelapseRequest {
        require_all_frames: true,
        ..request(4)
    };
    let err = generate_frames(&guide, &req, &mut generator, &cfg(), &CancelFlag::new())
        .unwrap_err();
    assert!(matches!(
        err,
        DaylapseError::FrameCountMismatch {
            requested: 4,
            produced: 2
        }
    ));
}

#[test]
fn cancelled_flag_stops_before_inference() {
    let guide = Frame::solid(8, 8, [120, 120, 120, 255]);
    let mut generator = Flaky::new(vec![]);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = generate_frames(&guide, &request(3), &mut generator, &cfg(), &cancel).unwrap_err();
    assert!(matches!(err, DaylapseError::Cancelled));
    assert_eq!(generator.calls, 0);
}

#[test]
fn invalid_requests_are_rejected() {
    let guide = Frame::solid(8, 8, [0, 0, 0, 255]);
    let mut generator = Flaky::new(vec![]);
    let req = TimelapseRequest {
        alpha: 1.5,
        ..request(2)
    };
    assert!(matches!(
        generate_frames(&guide, &req, &mut generator, &cfg(), &CancelFlag::new()),
        Err(DaylapseError::Validation(_))
    ));
}

#[test]
fn grade_generator_output_is_deterministic_per_seed() {
    let guide = Frame::from_image(image::RgbaImage::from_fn(32, 32, |x, y| {
        image::Rgba([(x * 8) as u8, (y * 8) as u8, 90, 255])
    }));
    let run = |seed: u64| {
        let mut generator = GradeGenerator::new(8);
        let req = TimelapseRequest {
            seed,
            ..request(2)
        };
        generate_frames(&guide, &req, &mut generator, &cfg(), &CancelFlag::new()).unwrap()
    };
    let a = run(7);
    let b = run(7);
    assert_eq!(a.frames, b.frames);
    assert_eq!(a.frames[0].frame.dimensions(), (32, 32));
}

fn labelled(n: usize) -> Vec<TimelapseFrame> {
    (0..n)
        .map(|i| TimelapseFrame {
            frame: Frame::solid(2, 2, [0, 0, 0, 255]),
            index: i,
            hour: i as u8,
            time_of_day: TimeOfDay::from_hour(i as u8),
            model_time: 0.0,
        })
        .collect()
}

#[test]
fn reorder_moves_one_frame() {
    let mut frames = labelled(4);
    reorder_frames(&mut frames, 0, 2).unwrap();
    let order: Vec<usize> = frames.iter().map(|f| f.index).collect();
    assert_eq!(order, vec![1, 2, 0, 3]);

    reorder_frames(&mut frames, 3, 0).unwrap();
    let order: Vec<usize> = frames.iter().map(|f| f.index).collect();
    assert_eq!(order, vec![3, 1, 2, 0]);
}

#[test]
fn reorder_out_of_range_is_a_validation_error() {
    let mut frames = labelled(2);
    assert!(matches!(
        reorder_frames(&mut frames, 2, 0),
        Err(DaylapseError::Validation(_))
    ));
    assert!(reorder_frames(&mut frames, 0, 5).is_err());
}
