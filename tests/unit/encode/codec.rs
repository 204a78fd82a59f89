use super::*;

#[test]
fn presentation_times_follow_frame_rate() {
    let pts: Vec<u64> = (0..4).map(|i| presentation_time_us(i, 4)).collect();
    assert_eq!(pts, vec![0, 250_000, 500_000, 750_000]);
    assert_eq!(presentation_time_us(3, 30), 100_000);
    assert_eq!(presentation_time_us(7, 0), 0);
}

#[test]
fn format_from_default_config() {
    let f = EncoderFormat::from_config(&EncoderConfig::default(), 512, 512);
    assert_eq!(f.codec, VideoCodec::H264);
    assert_eq!(f.frame_rate, 4);
    assert_eq!(f.bitrate, 2_000_000);
    assert_eq!(f.gop_size, 4);
    f.validate().unwrap();
}

#[test]
fn format_validation_rejects_odd_and_zero_sizes() {
    let cfg = EncoderConfig::default();
    assert!(EncoderFormat::from_config(&cfg, 0, 8).validate().is_err());
    assert!(EncoderFormat::from_config(&cfg, 9, 8).validate().is_err());
    assert!(EncoderFormat::from_config(&cfg, 8, 7).validate().is_err());
    let mut f = EncoderFormat::from_config(&cfg, 8, 8);
    f.frame_rate = 0;
    assert!(f.validate().is_err());
}
