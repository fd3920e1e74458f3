pub(crate) mod avcc;
pub(crate) mod decoder;
#[cfg(feature = "media-ffmpeg")]
pub(crate) mod ffmpeg;
pub(crate) mod frame;
pub(crate) mod mp4;
pub(crate) mod pipeline;
pub(crate) mod protocol;
pub(crate) mod source;
pub(crate) mod store;
pub(crate) mod worker;

#[cfg(test)]
#[path = "../../tests/support/mp4_fixture.rs"]
pub(crate) mod mp4_fixture;
#[cfg(test)]
#[path = "../../tests/support/stub_decoder.rs"]
pub(crate) mod stub_decoder;
