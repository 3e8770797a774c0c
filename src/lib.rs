pub mod config;
pub mod decoder;
pub mod detection;
pub mod error;
pub mod filters;
pub mod frame;
pub mod math;
pub mod one_euro;
pub mod pipeline;
pub mod pose;
pub mod tensor;
pub mod tracker;

mod track;

pub use config::{DecoderConfig, ModelDims, OneEuroParams, PairCriterion};
pub use detection::Detection;
pub use frame::Frame;
pub use math::Intrinsics;
pub use pipeline::FootDecoder;
pub use track::{Pose, Track};

use error::Error;
use std::collections::HashMap;
use std::{fmt, rc::Rc};

pub trait Float: num_traits::Float + num_traits::FloatConst + fmt::Debug + 'static {}

impl<T> Float for T where T: num_traits::Float + num_traits::FloatConst + fmt::Debug + 'static {}

pub trait Tracking {
    fn update(&mut self, frame: &Frame<'_>, src: &str) -> Result<(), error::Error>;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
}

/// Keeps an independent [`FootDecoder`] per video source.
///
/// Every source gets its own tracker memory and filter registry, so frames
/// from two cameras never influence each other's identities.
pub struct FootTracker {
    config: DecoderConfig,
    intrinsics: Intrinsics,
    decoders: HashMap<String, FootDecoder>,
}

impl FootTracker {
    pub fn new(config: DecoderConfig, intrinsics: Intrinsics) -> Self {
        config.validate();

        Self {
            config,
            intrinsics,
            decoders: HashMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[inline]
    pub fn decoder(&self, src: &str) -> Option<&FootDecoder> {
        self.decoders.get(src)
    }

    /// Replaces the camera intrinsics of one source, or the default used for
    /// sources seen for the first time when `src` is not known yet.
    pub fn set_intrinsics(&mut self, src: &str, intrinsics: Intrinsics) {
        match self.decoders.get_mut(src) {
            Some(decoder) => decoder.set_camera_intrinsics(intrinsics),
            None => self.intrinsics = intrinsics,
        }
    }

    pub fn remove(&mut self, src: &str) -> Option<FootDecoder> {
        self.decoders.remove(src)
    }
}

impl crate::Tracking for FootTracker {
    fn update(&mut self, frame: &Frame<'_>, src: &str) -> Result<(), Error> {
        let decoder = if let Some(decoder) = self.decoders.get_mut(src) {
            decoder
        } else {
            let decoder = FootDecoder::new(self.config.clone(), self.intrinsics)?;
            log::debug!("new source `{}`", src);

            self.decoders.entry(src.to_string()).or_insert(decoder)
        };

        decoder.decode_feet(frame)?;

        Ok(())
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(decoder) = self.decoders.get(src) {
            return decoder.displayable().into_boxed_slice().into();
        }

        Rc::new([])
    }
}
