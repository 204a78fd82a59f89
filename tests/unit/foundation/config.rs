use super::*;

#[test]
fn encoder_defaults_match_the_product_settings() {
    let cfg = EncoderConfig::default();
    assert_eq!(cfg.codec.mime(), "video/avc");
    assert_eq!(cfg.container, ContainerFormat::Mp4);
    assert_eq!(cfg.frame_rate, 4);
    assert_eq!(cfg.bitrate, 2_000_000);
    assert_eq!(cfg.keyframe_interval_secs, 1);
    assert_eq!(cfg.gop_size(), 4);
    assert_eq!(cfg.dequeue_timeout(), std::time::Duration::from_millis(10));
    cfg.validate().unwrap();
}

#[test]
fn encoder_validation_rejects_zeros() {
    for cfg in [
        EncoderConfig {
            frame_rate: 0,
            ..Default::default()
        },
        EncoderConfig {
            bitrate: 0,
            ..Default::default()
        },
        EncoderConfig {
            keyframe_interval_secs: 0,
            ..Default::default()
        },
        EncoderConfig {
            dequeue_timeout_us: 0,
            ..Default::default()
        },
    ] {
        assert!(matches!(cfg.validate(), Err(DaylapseError::Validation(_))));
    }
}

#[test]
fn request_validation_covers_each_field() {
    TimelapseRequest::default().validate().unwrap();
    let bad = [
        TimelapseRequest {
            frame_count: 0,
            ..Default::default()
        },
        TimelapseRequest {
            start_hour: 24,
            ..Default::default()
        },
        TimelapseRequest {
            end_hour: 30,
            ..Default::default()
        },
        TimelapseRequest {
            alpha: 1.5,
            ..Default::default()
        },
        TimelapseRequest {
            alpha: f32::NAN,
            ..Default::default()
        },
    ];
    for req in bad {
        assert!(req.validate().is_err(), "{req:?}");
    }
}

#[test]
fn pipeline_config_fills_missing_fields() {
    let cfg =
        PipelineConfig::from_reader(r#"{ "encoder": { "frame_rate": 8 }, "guide_size": 256 }"#.as_bytes())
            .unwrap();
    assert_eq!(cfg.encoder.frame_rate, 8);
    assert_eq!(cfg.encoder.bitrate, 2_000_000);
    assert_eq!(cfg.guide_size, 256);
    assert_eq!(cfg.inference_size, 128);
    assert_eq!(cfg.latent_dim, 128);
}

#[test]
fn pipeline_config_rejects_bad_json_and_values() {
    assert!(PipelineConfig::from_reader("{ nope".as_bytes()).is_err());
    assert!(PipelineConfig::from_reader(r#"{ "latent_dim": 0 }"#.as_bytes()).is_err());
    assert!(PipelineConfig::from_reader(r#"{ "encoder": { "codec": "vp9" } }"#.as_bytes()).is_err());
}

#[test]
fn pipeline_config_round_trips_through_json() {
    let cfg = PipelineConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"h264\""));
    let back = PipelineConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(back, cfg);
}
