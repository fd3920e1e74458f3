use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::media::avcc::AvcDecoderConfig;

const fn fourcc(b: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*b)
}

const MOOV: u32 = fourcc(b"moov");
const MVHD: u32 = fourcc(b"mvhd");
const TRAK: u32 = fourcc(b"trak");
const TKHD: u32 = fourcc(b"tkhd");
const MDIA: u32 = fourcc(b"mdia");
const MDHD: u32 = fourcc(b"mdhd");
const HDLR: u32 = fourcc(b"hdlr");
const MINF: u32 = fourcc(b"minf");
const STBL: u32 = fourcc(b"stbl");
const STSD: u32 = fourcc(b"stsd");
const STTS: u32 = fourcc(b"stts");
const STSC: u32 = fourcc(b"stsc");
const STSZ: u32 = fourcc(b"stsz");
const STCO: u32 = fourcc(b"stco");
const CO64: u32 = fourcc(b"co64");
const STSS: u32 = fourcc(b"stss");
const CTTS: u32 = fourcc(b"ctts");
const AVCC: u32 = fourcc(b"avcC");
const VIDE: u32 = fourcc(b"vide");

const TOP_LEVEL: [&[u8; 4]; 12] = [
    b"ftyp", b"styp", b"moov", b"mdat", b"free", b"skip", b"wide", b"uuid", b"pdin", b"sidx",
    b"moof", b"meta",
];

/// Visual sample entry fields preceding child boxes.
const VISUAL_SAMPLE_ENTRY_LEN: usize = 78;

/// Largest sample table accepted; about 19 hours at 60 fps.
const MAX_SAMPLES: usize = 1 << 22;

/// One sample of the video track, in decode order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SampleEntry {
    /// Absolute byte offset in the file.
    pub offset: u64,
    /// Size in bytes.
    pub size: u32,
    /// Decode timestamp, track timescale units.
    pub dts: i64,
    /// Composition timestamp, track timescale units.
    pub cts: i64,
    /// Duration, track timescale units.
    pub duration: u32,
    /// Random access point.
    pub is_sync: bool,
}

/// The first video track of a container.
#[derive(Clone, Debug, serde::Serialize)]
pub struct VideoTrack {
    /// `tkhd` track id.
    pub track_id: u32,
    /// Sample entry fourcc (`avc1` / `avc3`).
    pub codec_fourcc: String,
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Duration in seconds, from `mdhd` or `mvhd`.
    pub duration: Option<f64>,
    /// Parsed `avcC`.
    pub avcc: AvcDecoderConfig,
    /// Sample table.
    #[serde(skip)]
    pub samples: Vec<SampleEntry>,
}

impl VideoTrack {
    /// RFC 6381 codec string.
    pub fn codec(&self) -> String {
        self.avcc.codec_string(&self.codec_fourcc)
    }

    /// Convert track ticks to microseconds.
    pub fn ticks_to_us(&self, ticks: i64) -> i64 {
        (i128::from(ticks) * 1_000_000 / i128::from(self.timescale.max(1))) as i64
    }
}

/// A demuxed sample with its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mp4Sample {
    /// Position in decode order.
    pub index: usize,
    /// Random access point.
    pub is_sync: bool,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// Duration in microseconds.
    pub duration_us: i64,
    /// Length-prefixed NAL units.
    pub data: Vec<u8>,
}

/// Incremental MP4 demuxer.
///
/// Bytes are appended as they arrive. Once the `moov` box is complete the first video track
/// becomes available, and samples are handed out in decode order as soon as their bytes are
/// buffered, whether `moov` precedes `mdat` or not.
#[derive(Debug, Default)]
pub struct Mp4Demuxer {
    buf: Vec<u8>,
    scan: usize,
    scan_done: bool,
    track: Option<VideoTrack>,
    next: usize,
    finished: bool,
}

impl Mp4Demuxer {
    /// Empty demuxer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append source bytes. Returns `true` when the video track became ready during this call.
    pub fn append(&mut self, bytes: &[u8]) -> ScrollyResult<bool> {
        self.buf.extend_from_slice(bytes);
        let was_ready = self.track.is_some();
        self.scan_boxes()?;
        Ok(!was_ready && self.track.is_some())
    }

    /// Signal end of input. Fails if no usable track was found or samples are missing bytes.
    pub fn finish(&mut self) -> ScrollyResult<()> {
        self.finished = true;
        let Some(track) = &self.track else {
            return Err(ScrollyError::unsupported("no moov box before end of input"));
        };
        let have = self.buf.len() as u64;
        if let Some(s) = track.samples[self.next..]
            .iter()
            .find(|s| s.offset.checked_add(u64::from(s.size)).is_none_or(|end| end > have))
        {
            return Err(ScrollyError::unsupported(format!(
                "sample at offset {} runs past end of file ({have} bytes)",
                s.offset
            )));
        }
        Ok(())
    }

    /// Whether the video track is known.
    pub fn is_ready(&self) -> bool {
        self.track.is_some()
    }

    /// The video track, once ready.
    pub fn track(&self) -> Option<&VideoTrack> {
        self.track.as_ref()
    }

    /// Samples not yet handed out.
    pub fn remaining(&self) -> usize {
        self.track
            .as_ref()
            .map_or(0, |t| t.samples.len().saturating_sub(self.next))
    }

    /// Next sample in decode order, if its bytes are buffered.
    pub fn next_sample(&mut self) -> Option<Mp4Sample> {
        let track = self.track.as_ref()?;
        let entry = *track.samples.get(self.next)?;
        let start = usize::try_from(entry.offset).ok()?;
        let end = start.checked_add(entry.size as usize)?;
        let data = self.buf.get(start..end)?.to_vec();
        let index = self.next;
        self.next += 1;
        Some(Mp4Sample {
            index,
            is_sync: entry.is_sync,
            timestamp_us: track.ticks_to_us(entry.cts),
            duration_us: track.ticks_to_us(i64::from(entry.duration)),
            data,
        })
    }

    fn scan_boxes(&mut self) -> ScrollyResult<()> {
        while !self.scan_done {
            let Some(rest) = self.buf.get(self.scan..) else {
                return Ok(());
            };
            let Some(header) = read_box_header(rest)? else {
                return Ok(());
            };
            if self.scan == 0 && !TOP_LEVEL.iter().any(|t| fourcc(t) == header.kind) {
                return Err(ScrollyError::unsupported(format!(
                    "not an MP4 file (first box '{}')",
                    fourcc_str(header.kind)
                )));
            }
            if header.kind == MOOV {
                let Some(size) = header.size else {
                    return Err(ScrollyError::unsupported("moov box without size"));
                };
                let end = self
                    .scan
                    .checked_add(size)
                    .ok_or_else(|| ScrollyError::unsupported("moov box too large"))?;
                if self.buf.len() < end {
                    return Ok(());
                }
                let track = parse_moov(&self.buf[self.scan + header.header_len..end])?;
                tracing::debug!(
                    codec = %track.codec(),
                    width = track.width,
                    height = track.height,
                    samples = track.samples.len(),
                    "mp4 video track ready"
                );
                self.track = Some(track);
                self.scan_done = true;
                return Ok(());
            }
            match header.size {
                Some(size) => {
                    self.scan = self.scan.checked_add(size).ok_or_else(|| {
                        ScrollyError::unsupported(format!(
                            "box '{}' too large",
                            fourcc_str(header.kind)
                        ))
                    })?;
                }
                None => {
                    // Box runs to end of file; nothing follows it.
                    self.scan_done = true;
                }
            }
        }
        Ok(())
    }
}

struct BoxHeader {
    kind: u32,
    header_len: usize,
    /// Total size; `None` for "extends to end of file".
    size: Option<usize>,
}

/// Parse a box header at the start of `data`. `Ok(None)` means more bytes are needed.
fn read_box_header(data: &[u8]) -> ScrollyResult<Option<BoxHeader>> {
    if data.len() < 8 {
        return Ok(None);
    }
    let size32 = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let kind = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    let (header_len, size) = match size32 {
        0 => (8, None),
        1 => {
            if data.len() < 16 {
                return Ok(None);
            }
            let mut b = [0u8; 8];
            b.copy_from_slice(&data[8..16]);
            let size = usize::try_from(u64::from_be_bytes(b))
                .map_err(|_| ScrollyError::unsupported("box too large"))?;
            (16, Some(size))
        }
        n => (8, Some(n as usize)),
    };
    if size.is_some_and(|s| s < header_len) {
        return Err(ScrollyError::unsupported(format!(
            "invalid size for box '{}'",
            fourcc_str(kind)
        )));
    }
    Ok(Some(BoxHeader {
        kind,
        header_len,
        size,
    }))
}

/// Child boxes of a container payload.
fn children(data: &[u8]) -> ScrollyResult<Vec<(u32, &[u8])>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 8 <= data.len() {
        let Some(h) = read_box_header(&data[pos..])? else {
            break;
        };
        let end = match h.size {
            Some(s) => pos.checked_add(s).ok_or_else(|| {
                ScrollyError::unsupported(format!("box '{}' too large", fourcc_str(h.kind)))
            })?,
            None => data.len(),
        };
        let payload = data.get(pos + h.header_len..end).ok_or_else(|| {
            ScrollyError::unsupported(format!("box '{}' overruns its parent", fourcc_str(h.kind)))
        })?;
        out.push((h.kind, payload));
        pos = end;
    }
    Ok(out)
}

fn child(data: &[u8], kind: u32) -> ScrollyResult<Option<&[u8]>> {
    Ok(children(data)?
        .into_iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, p)| p))
}

fn fourcc_str(kind: u32) -> String {
    kind.to_be_bytes()
        .iter()
        .map(|b| if b.is_ascii_graphic() { *b as char } else { '?' })
        .collect()
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    fn bytes(&mut self, n: usize) -> ScrollyResult<&'a [u8]> {
        let out = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| ScrollyError::unsupported(format!("truncated {} box", self.what)))?;
        self.pos += n;
        Ok(out)
    }

    fn skip(&mut self, n: usize) -> ScrollyResult<()> {
        self.bytes(n).map(|_| ())
    }

    fn u8(&mut self) -> ScrollyResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> ScrollyResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> ScrollyResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> ScrollyResult<u64> {
        let hi = self.u32()?;
        let lo = self.u32()?;
        Ok((u64::from(hi) << 32) | u64::from(lo))
    }

    /// Version byte, skipping the 24-bit flags.
    fn full_box(&mut self) -> ScrollyResult<u8> {
        let v = self.u8()?;
        self.skip(3)?;
        Ok(v)
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

/// `(timescale, duration)` of an `mvhd` or `mdhd` payload.
fn parse_header_times(data: &[u8], what: &'static str) -> ScrollyResult<(u32, u64)> {
    let mut r = Reader::new(data, what);
    if r.full_box()? == 1 {
        r.skip(16)?;
        let ts = r.u32()?;
        Ok((ts, r.u64()?))
    } else {
        r.skip(8)?;
        let ts = r.u32()?;
        Ok((ts, u64::from(r.u32()?)))
    }
}

fn seconds(timescale: u32, duration: u64) -> Option<f64> {
    (timescale > 0 && duration > 0 && duration != u64::from(u32::MAX))
        .then(|| duration as f64 / f64::from(timescale))
}

fn parse_moov(moov: &[u8]) -> ScrollyResult<VideoTrack> {
    let movie_duration = match child(moov, MVHD)? {
        Some(mvhd) => {
            let (ts, d) = parse_header_times(mvhd, "mvhd")?;
            seconds(ts, d)
        }
        None => None,
    };

    for (kind, trak) in children(moov)? {
        if kind != TRAK {
            continue;
        }
        let Some(mdia) = child(trak, MDIA)? else {
            continue;
        };
        let Some(hdlr) = child(mdia, HDLR)? else {
            continue;
        };
        let mut r = Reader::new(hdlr, "hdlr");
        r.full_box()?;
        r.skip(4)?;
        if r.u32()? != VIDE {
            continue;
        }
        return parse_video_trak(trak, mdia, movie_duration);
    }
    Err(ScrollyError::unsupported("no video track"))
}

fn parse_video_trak(
    trak: &[u8],
    mdia: &[u8],
    movie_duration: Option<f64>,
) -> ScrollyResult<VideoTrack> {
    let track_id = match child(trak, TKHD)? {
        Some(tkhd) => {
            let mut r = Reader::new(tkhd, "tkhd");
            let skip = if r.full_box()? == 1 { 16 } else { 8 };
            r.skip(skip)?;
            r.u32()?
        }
        None => 0,
    };

    let mdhd = child(mdia, MDHD)?.ok_or_else(|| ScrollyError::unsupported("missing mdhd"))?;
    let (timescale, media_duration) = parse_header_times(mdhd, "mdhd")?;
    if timescale == 0 {
        return Err(ScrollyError::unsupported("mdhd timescale is zero"));
    }

    let stbl = child(mdia, MINF)?
        .map(|minf| child(minf, STBL))
        .transpose()?
        .flatten()
        .ok_or_else(|| ScrollyError::unsupported("missing stbl"))?;

    let stsd = child(stbl, STSD)?.ok_or_else(|| ScrollyError::unsupported("missing stsd"))?;
    let (codec_fourcc, width, height, avcc) = parse_stsd(stsd)?;
    let samples = build_sample_table(stbl)?;
    if samples.is_empty() {
        return Err(ScrollyError::unsupported(
            "video track has no samples (fragmented MP4 is not supported)",
        ));
    }

    Ok(VideoTrack {
        track_id,
        codec_fourcc,
        width,
        height,
        timescale,
        duration: seconds(timescale, media_duration).or(movie_duration),
        avcc,
        samples,
    })
}

fn parse_stsd(stsd: &[u8]) -> ScrollyResult<(String, u32, u32, AvcDecoderConfig)> {
    let mut r = Reader::new(stsd, "stsd");
    r.full_box()?;
    if r.u32()? == 0 {
        return Err(ScrollyError::unsupported("stsd has no sample entries"));
    }
    let entries = children(r.rest())?;
    let Some((kind, entry)) = entries.first().copied() else {
        return Err(ScrollyError::unsupported("stsd has no sample entries"));
    };
    let name = fourcc_str(kind);
    if name != "avc1" && name != "avc3" {
        return Err(ScrollyError::unsupported(format!("codec '{name}' is not supported")));
    }
    let mut v = Reader::new(entry, "visual sample entry");
    v.skip(24)?;
    let width = u32::from(v.u16()?);
    let height = u32::from(v.u16()?);
    let extra = entry
        .get(VISUAL_SAMPLE_ENTRY_LEN..)
        .ok_or_else(|| ScrollyError::unsupported("truncated visual sample entry"))?;
    let avcc = child(extra, AVCC)?.ok_or_else(|| ScrollyError::unsupported("missing avcC"))?;
    Ok((name, width, height, AvcDecoderConfig::parse(avcc)?))
}

/// Entry count of a sample-table box, rejected when the box cannot hold that many entries.
fn entry_count(r: &mut Reader<'_>, entry_len: usize) -> ScrollyResult<usize> {
    let n = r.u32()? as usize;
    if n.checked_mul(entry_len).is_none_or(|len| len > r.rest().len()) {
        return Err(ScrollyError::unsupported(format!(
            "{} box lists {n} entries but holds {} bytes",
            r.what,
            r.rest().len()
        )));
    }
    Ok(n)
}

fn build_sample_table(stbl: &[u8]) -> ScrollyResult<Vec<SampleEntry>> {
    // sizes
    let stsz = child(stbl, STSZ)?.ok_or_else(|| ScrollyError::unsupported("missing stsz"))?;
    let mut sz = Reader::new(stsz, "stsz");
    sz.full_box()?;
    let uniform = sz.u32()?;
    let count = if uniform == 0 {
        entry_count(&mut sz, 4)?
    } else {
        sz.u32()? as usize
    };
    if count > MAX_SAMPLES {
        return Err(ScrollyError::unsupported(format!(
            "stsz lists {count} samples (at most {MAX_SAMPLES} supported)"
        )));
    }

    // chunk offsets
    let chunk_offsets: Vec<u64> = if let Some(stco) = child(stbl, STCO)? {
        let mut r = Reader::new(stco, "stco");
        r.full_box()?;
        let n = entry_count(&mut r, 4)?;
        (0..n).map(|_| r.u32().map(u64::from)).collect::<ScrollyResult<_>>()?
    } else if let Some(co64) = child(stbl, CO64)? {
        let mut r = Reader::new(co64, "co64");
        r.full_box()?;
        let n = entry_count(&mut r, 8)?;
        (0..n).map(|_| r.u64()).collect::<ScrollyResult<_>>()?
    } else {
        return Err(ScrollyError::unsupported("missing stco/co64"));
    };

    // sample-to-chunk: (first_chunk 0-based, samples_per_chunk)
    let stsc = child(stbl, STSC)?.ok_or_else(|| ScrollyError::unsupported("missing stsc"))?;
    let mut r = Reader::new(stsc, "stsc");
    r.full_box()?;
    let n = entry_count(&mut r, 12)?;
    let mut runs = Vec::with_capacity(n);
    for _ in 0..n {
        let first = r.u32()?.saturating_sub(1) as usize;
        let per_chunk = r.u32()? as usize;
        r.skip(4)?;
        runs.push((first, per_chunk));
    }
    let per_chunk: Vec<usize> = (0..chunk_offsets.len())
        .map(|chunk| {
            runs.iter()
                .rev()
                .find(|(first, _)| *first <= chunk)
                .map_or(0, |(_, n)| *n)
        })
        .collect();
    let capacity = per_chunk.iter().fold(0usize, |acc, n| acc.saturating_add(*n));
    if count > capacity {
        return Err(ScrollyError::unsupported(format!(
            "chunk table covers {capacity} of {count} samples"
        )));
    }

    let sizes = if uniform != 0 {
        vec![uniform; count]
    } else {
        (0..count).map(|_| sz.u32()).collect::<ScrollyResult<Vec<_>>>()?
    };

    let mut offsets = Vec::with_capacity(count);
    'chunks: for (base, n) in chunk_offsets.iter().zip(&per_chunk) {
        let mut off = *base;
        for _ in 0..*n {
            let Some(size) = sizes.get(offsets.len()) else {
                break 'chunks;
            };
            let end = off.checked_add(u64::from(*size)).ok_or_else(|| {
                ScrollyError::unsupported(format!("sample at offset {off} overflows the file"))
            })?;
            offsets.push(off);
            off = end;
        }
    }

    // decode times
    let mut durations = Vec::with_capacity(count);
    if let Some(stts) = child(stbl, STTS)? {
        let mut r = Reader::new(stts, "stts");
        r.full_box()?;
        for _ in 0..entry_count(&mut r, 8)? {
            let run = r.u32()? as usize;
            let delta = r.u32()?;
            let take = run.min(count - durations.len());
            durations.extend(std::iter::repeat_n(delta, take));
        }
    }
    durations.resize(count, durations.last().copied().unwrap_or(0));

    // composition offsets
    let mut cts_offsets = vec![0i64; count];
    if let Some(ctts) = child(stbl, CTTS)? {
        let mut r = Reader::new(ctts, "ctts");
        r.full_box()?;
        let mut i = 0usize;
        for _ in 0..entry_count(&mut r, 8)? {
            let run = r.u32()? as usize;
            let off = i64::from(r.u32()? as i32);
            for slot in cts_offsets.iter_mut().skip(i).take(run) {
                *slot = off;
            }
            i = i.saturating_add(run);
        }
    }

    // sync samples: absent box means every sample is a keyframe
    let sync: Option<Vec<u32>> = match child(stbl, STSS)? {
        Some(stss) => {
            let mut r = Reader::new(stss, "stss");
            r.full_box()?;
            let n = entry_count(&mut r, 4)?;
            Some((0..n).map(|_| r.u32()).collect::<ScrollyResult<_>>()?)
        }
        None => None,
    };

    let mut dts = 0i64;
    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let is_sync = sync
            .as_ref()
            .is_none_or(|s| s.binary_search(&(i as u32 + 1)).is_ok());
        samples.push(SampleEntry {
            offset: offsets[i],
            size: sizes[i],
            dts,
            cts: dts + cts_offsets[i],
            duration: durations[i],
            is_sync,
        });
        dts += i64::from(durations[i]);
    }
    Ok(samples)
}

#[cfg(test)]
#[path = "../../tests/unit/media/mp4.rs"]
mod tests;
