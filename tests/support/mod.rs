#![allow(dead_code)]


use std::sync::Arc;

use scrolly::{DecoderFactory, ScrollyResult, VideoDecoder};

use self::stub_decoder::{StubBehavior, StubDecoder};

/// Factory handing out a fresh [`StubDecoder`] per session.
pub fn stub_factory(behavior: StubBehavior) -> Arc<dyn DecoderFactory> {
    Arc::new(move || -> ScrollyResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(StubDecoder::new(behavior.clone()).0))
    })
}
