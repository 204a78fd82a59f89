//! H.264 Annex B byte-stream helpers.

use bytes::{Bytes, BytesMut};

/// NAL unit types used by the encoder plumbing.
pub(crate) mod nal_type {
    /// Coded slice of a non-IDR picture.
    pub(crate) const NON_IDR_SLICE: u8 = 1;
    /// Coded slice of an IDR picture.
    pub(crate) const IDR_SLICE: u8 = 5;
    /// Supplemental enhancement information.
    pub(crate) const SEI: u8 = 6;
    /// Sequence parameter set.
    pub(crate) const SPS: u8 = 7;
    /// Picture parameter set.
    pub(crate) const PPS: u8 = 8;
    /// Access unit delimiter.
    pub(crate) const AUD: u8 = 9;
}

const START_CODE: [u8; 4] = [0, 0, 0, 1];

pub(crate) fn nal_type_of(nal: &[u8]) -> Option<u8> {
    nal.first().map(|b| b & 0x1F)
}

/// Split an Annex B buffer into NAL payloads (start codes removed).
///
/// Accepts both 3-byte and 4-byte start codes. Bytes before the first start code are ignored.
pub(crate) fn split_nals(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            starts.push(i);
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut nals = Vec::with_capacity(starts.len());
    for (idx, &sc) in starts.iter().enumerate() {
        let begin = sc + 3;
        let mut end = starts.get(idx + 1).copied().unwrap_or(data.len());
        // Zero bytes before the next start code are either its 4th byte or trailing padding.
        while end > begin && data[end - 1] == 0 {
            end -= 1;
        }
        if begin < end {
            nals.push(&data[begin..end]);
        }
    }
    nals
}

/// One coded picture with its parameter sets pulled out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AccessUnit {
    /// Annex B payload with 4-byte start codes and without delimiters.
    pub(crate) data: Bytes,
    /// Contains an IDR slice.
    pub(crate) key_frame: bool,
    /// SPS carried in this unit, if any.
    pub(crate) sps: Option<Bytes>,
    /// PPS carried in this unit, if any.
    pub(crate) pps: Option<Bytes>,
}

impl AccessUnit {
    /// Build a unit from one delimiter-to-delimiter span. Returns `None` when nothing but
    /// delimiters remain.
    pub(crate) fn from_annex_b(data: &[u8]) -> Option<Self> {
        let mut out = BytesMut::with_capacity(data.len() + 8);
        let mut key_frame = false;
        let mut sps = None;
        let mut pps = None;

        for nal in split_nals(data) {
            let Some(ty) = nal_type_of(nal) else {
                continue;
            };
            match ty {
                nal_type::AUD => continue,
                nal_type::IDR_SLICE => key_frame = true,
                nal_type::SPS => sps = Some(Bytes::copy_from_slice(nal)),
                nal_type::PPS => pps = Some(Bytes::copy_from_slice(nal)),
                nal_type::NON_IDR_SLICE | nal_type::SEI => {}
                _ => {}
            }
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nal);
        }

        if out.is_empty() {
            return None;
        }
        Some(Self {
            data: out.freeze(),
            key_frame,
            sps,
            pps,
        })
    }
}

/// Incremental splitter that cuts a byte stream into access units at delimiter NALs.
///
/// The stream must carry an access unit delimiter in front of every picture.
#[derive(Debug, Default)]
pub(crate) struct AccessUnitSplitter {
    pending: BytesMut,
    scan_from: usize,
}

impl AccessUnitSplitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append stream bytes and return every unit completed by them.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<AccessUnit> {
        self.pending.extend_from_slice(chunk);

        let mut cuts = Vec::new();
        let mut i = self.scan_from;
        while i + 2 < self.pending.len() {
            let d = &self.pending;
            if d[i] == 0 && d[i + 1] == 0 && d[i + 2] == 1 {
                let Some(&header) = d.get(i + 3) else {
                    // Header byte not read yet; rescan this start code next time.
                    break;
                };
                if header & 0x1F == nal_type::AUD {
                    let cut = if i > 0 && d[i - 1] == 0 { i - 1 } else { i };
                    if cut > cuts.last().copied().unwrap_or(0) {
                        cuts.push(cut);
                    }
                }
                i += 3;
            } else {
                i += 1;
            }
        }
        self.scan_from = i;

        let mut units = Vec::with_capacity(cuts.len());
        let mut consumed = 0;
        for cut in cuts {
            let span = self.pending.split_to(cut - consumed);
            consumed = cut;
            if let Some(unit) = AccessUnit::from_annex_b(&span) {
                units.push(unit);
            }
        }
        self.scan_from -= consumed;
        units
    }

    /// Flush the trailing unit at end of stream.
    pub(crate) fn finish(self) -> Option<AccessUnit> {
        AccessUnit::from_annex_b(&self.pending)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/annexb.rs"]
mod tests;
