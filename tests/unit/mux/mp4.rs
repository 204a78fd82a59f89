use super::*;
use crate::encode::codec::BufferFlags;
use bytes::Bytes;

fn format() -> TrackFormat {
    TrackFormat {
        codec: VideoCodec::H264,
        width: 64,
        height: 64,
        frame_rate: 4,
        sps: Bytes::from_static(&[0x67, 0x42, 0x00, 0x1E]),
        pps: Bytes::from_static(&[0x68, 0xCE, 0x3C, 0x80]),
    }
}

fn path(name: &str) -> PathBuf {
    PathBuf::from("target").join("unit_mp4").join(name)
}

#[test]
fn only_one_track_is_accepted() {
    let mut m = Mp4Muxer::new(path("one_track.mp4"));
    assert_eq!(m.add_track(&format()).unwrap(), TrackId(0));
    assert!(matches!(m.add_track(&format()), Err(DaylapseError::Mux(_))));
}

#[test]
fn zero_sized_tracks_are_rejected() {
    let mut m = Mp4Muxer::new(path("zero.mp4"));
    let mut f = format();
    f.width = 0;
    assert!(m.add_track(&f).is_err());
}

#[test]
fn protocol_order_is_enforced() {
    let mut m = Mp4Muxer::new(path("order.mp4"));
    assert!(m.start().is_err());
    let buf = OutputBuffer {
        index: 0,
        data: Bytes::from_static(&[0, 0, 0, 1, 0x65, 0x88]),
        presentation_time_us: 0,
        flags: BufferFlags {
            key_frame: true,
            end_of_stream: false,
        },
    };
    assert!(m.write_sample(TrackId(0), &buf).is_err());
    assert!(m.stop().is_err());
    assert_eq!(m.samples_written(), 0);
    m.release();
    m.release();
}

#[test]
fn formats_without_parameter_sets_are_rejected() {
    let mut m = Mp4Muxer::new(path("no_sps.mp4"));
    let mut f = format();
    f.pps = Bytes::new();
    assert!(matches!(m.add_track(&f), Err(DaylapseError::Mux(_))));
    let mut f = format();
    f.sps = Bytes::new();
    assert!(m.add_track(&f).is_err());
}

const IDR_WITH_PARAMS: &[u8] = &[
    0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1e, 0xda, 0x02, 0x80, 0x2d, 0x8b, 0x11, 0x00,
    0x00, 0x00, 0x01, 0x68, 0xce, 0x38, 0x80, 0x00, 0x00, 0x00, 0x01, 0x65, 0xaa, 0xbb, 0xcc,
    0xdd,
];
const P_SLICE: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x41, 0x9a, 0x22, 0x33];

fn sample(data: &'static [u8], pts_us: u64, key: bool) -> OutputBuffer {
    OutputBuffer {
        index: 0,
        data: Bytes::from_static(data),
        presentation_time_us: pts_us,
        flags: BufferFlags {
            key_frame: key,
            end_of_stream: false,
        },
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn canned_annexb_stream_finalizes_into_mp4() {
    let out = path("canned.mp4");
    let _ = std::fs::remove_file(&out);
    let mut m = Mp4Muxer::new(out.clone());
    let track = m.add_track(&format()).unwrap();
    m.start().unwrap();
    m.write_sample(track, &sample(IDR_WITH_PARAMS, 0, true)).unwrap();
    m.write_sample(track, &sample(P_SLICE, 250_000, false)).unwrap();
    m.write_sample(track, &sample(P_SLICE, 500_000, false)).unwrap();
    m.stop().unwrap();
    assert_eq!(m.samples_written(), 3);
    m.release();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[4..8], b"ftyp");
    assert!(contains(&bytes, b"moov"));
    assert!(contains(&bytes, b"mdat"));
    assert!(contains(&bytes, b"avcC"));
    // SPS lands in avcC without its start code.
    assert!(contains(&bytes, &[0x67, 0x42, 0x00, 0x1e, 0xda, 0x02]));
    assert!(matches!(m.stop(), Err(DaylapseError::Mux(_))));
}

#[test]
fn first_sample_must_be_a_parameterized_keyframe() {
    let mut m = Mp4Muxer::new(path("no_key.mp4"));
    let track = m.add_track(&format()).unwrap();
    m.start().unwrap();
    assert!(matches!(
        m.write_sample(track, &sample(P_SLICE, 0, false)),
        Err(DaylapseError::Mux(_))
    ));
    assert_eq!(m.samples_written(), 0);
    m.release();
}
