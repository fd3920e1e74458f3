use crate::foundation::error::{ScrollyError, ScrollyResult};

const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Parsed `avcC` box (AVCDecoderConfigurationRecord).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AvcDecoderConfig {
    /// `configurationVersion`, always 1.
    pub version: u8,
    /// `AVCProfileIndication`.
    pub profile: u8,
    /// `profile_compatibility`.
    pub profile_compat: u8,
    /// `AVCLevelIndication`.
    pub level: u8,
    /// NAL length prefix size minus one (0, 1 or 3).
    pub length_size_minus_one: u8,
    /// Sequence parameter sets.
    pub sps: Vec<Vec<u8>>,
    /// Picture parameter sets.
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    /// Parse the payload of an `avcC` box (without its 8-byte header).
    ///
    /// Trailing high-profile extension fields are ignored.
    pub fn parse(bytes: &[u8]) -> ScrollyResult<Self> {
        let mut r = Cursor { bytes, pos: 0 };
        let version = r.u8()?;
        if version != 1 {
            return Err(ScrollyError::unsupported(format!(
                "avcC version {version} is not supported"
            )));
        }
        let profile = r.u8()?;
        let profile_compat = r.u8()?;
        let level = r.u8()?;
        let length_size_minus_one = r.u8()? & 0b11;
        if length_size_minus_one == 2 {
            return Err(ScrollyError::unsupported("avcC NAL length size of 3 bytes"));
        }
        let nb_sps = r.u8()? & 0b1_1111;
        let sps = (0..nb_sps)
            .map(|_| r.prefixed())
            .collect::<ScrollyResult<Vec<_>>>()?;
        let nb_pps = r.u8()?;
        let pps = (0..nb_pps)
            .map(|_| r.prefixed())
            .collect::<ScrollyResult<Vec<_>>>()?;
        if sps.is_empty() {
            return Err(ScrollyError::unsupported("avcC carries no SPS"));
        }
        Ok(Self {
            version,
            profile,
            profile_compat,
            level,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    /// Compact decoder description handed to the decoder at configure time.
    ///
    /// Reserved bits are set the way encoders write them (`0b111111xx`, `0b111xxxxx`).
    pub fn to_description(&self) -> Vec<u8> {
        let body: usize = self
            .sps
            .iter()
            .chain(&self.pps)
            .map(|p| p.len() + 2)
            .sum();
        let mut out = Vec::with_capacity(7 + body);
        out.push(self.version);
        out.push(self.profile);
        out.push(self.profile_compat);
        out.push(self.level);
        out.push(0b1111_1100 | (self.length_size_minus_one & 0b11));
        out.push(0b1110_0000 | (self.sps.len() as u8 & 0b1_1111));
        for sps in &self.sps {
            out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
            out.extend_from_slice(sps);
        }
        out.push(self.pps.len() as u8);
        for pps in &self.pps {
            out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
            out.extend_from_slice(pps);
        }
        out
    }

    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub fn codec_string(&self, fourcc: &str) -> String {
        format!(
            "{fourcc}.{:02x}{:02x}{:02x}",
            self.profile, self.profile_compat, self.level
        )
    }

    /// Bytes in each NAL length prefix.
    pub fn nal_length_size(&self) -> usize {
        usize::from(self.length_size_minus_one) + 1
    }

    /// Rewrite a length-prefixed sample as an Annex-B byte stream.
    ///
    /// Keyframes are preceded by every SPS and PPS so a stream decoder can start on them.
    pub fn to_annex_b(&self, sample: &[u8], keyframe: bool) -> ScrollyResult<Vec<u8>> {
        let mut out = Vec::with_capacity(sample.len() + 64);
        if keyframe {
            for ps in self.sps.iter().chain(&self.pps) {
                out.extend_from_slice(&START_CODE);
                out.extend_from_slice(ps);
            }
        }
        let n = self.nal_length_size();
        let mut pos = 0;
        while pos < sample.len() {
            let Some(prefix) = sample.get(pos..pos + n) else {
                return Err(ScrollyError::decoder("truncated NAL length prefix"));
            };
            let len = prefix
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
            pos += n;
            let Some(nal) = sample.get(pos..pos + len) else {
                return Err(ScrollyError::decoder(format!(
                    "NAL of {len} bytes overruns sample of {}",
                    sample.len()
                )));
            };
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nal);
            pos += len;
        }
        Ok(out)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> ScrollyResult<&[u8]> {
        let out = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or_else(|| ScrollyError::unsupported("truncated avcC"))?;
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> ScrollyResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn prefixed(&mut self) -> ScrollyResult<Vec<u8>> {
        let b = self.take(2)?;
        let len = usize::from(u16::from_be_bytes([b[0], b[1]]));
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/avcc.rs"]
mod tests;
