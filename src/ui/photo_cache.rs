//! Decoded-photo cache for terminal rendering.
//!
//! Photo blobs are decoded and resized on worker threads and delivered over
//! a channel the draw loop polls, so rendering never blocks on image
//! decoding. Every cached texture is released either by `retain` when the
//! photo collection changes or by `clear` on view teardown; creations and
//! releases stay paired so the cache cannot grow without bound.

use image::DynamicImage;
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc;
use std::time::SystemTime;

use crate::capture::Frame;
use crate::config::ImageProtocol;
use crate::db::PhotoEntry;

pub struct PhotoCache {
    /// Picker for protocol detection; None disables image rendering.
    picker: Option<Picker>,
    /// Ready textures, keyed by "photo-id#max-size".
    cache: HashMap<String, StatefulProtocol>,
    /// Keys currently decoding on a worker thread.
    loading: HashSet<String>,
    receiver: mpsc::Receiver<(String, DynamicImage)>,
    sender: mpsc::Sender<(String, DynamicImage)>,
    /// Live-preview texture, rebuilt only when the frame timestamp moves.
    live: Option<(SystemTime, StatefulProtocol)>,
}

impl PhotoCache {
    pub fn new(protocol: ImageProtocol, enabled: bool) -> Self {
        let picker = if enabled {
            Self::create_picker(protocol)
        } else {
            None
        };
        let (sender, receiver) = mpsc::channel();
        Self {
            picker,
            cache: HashMap::new(),
            loading: HashSet::new(),
            receiver,
            sender,
            live: None,
        }
    }

    fn create_picker(protocol: ImageProtocol) -> Option<Picker> {
        match protocol {
            ImageProtocol::None => None,
            _ => Picker::from_query_stdio().ok(),
        }
    }

    /// Whether image rendering is available in this terminal.
    pub fn is_available(&self) -> bool {
        self.picker.is_some()
    }

    /// Drain completed decodes into the cache.
    pub fn poll(&mut self) {
        while let Ok((key, img)) = self.receiver.try_recv() {
            self.loading.remove(&key);
            if let Some(picker) = self.picker.as_mut() {
                let protocol = picker.new_resize_protocol(img);
                self.cache.insert(key, protocol);
            }
        }
    }

    fn cache_key(id: &str, max_size: u32) -> String {
        format!("{id}#{max_size}")
    }

    /// Texture for a stored photo, kicking off an async decode on first use.
    pub fn protocol(&mut self, photo: &PhotoEntry, max_size: u32) -> Option<&mut StatefulProtocol> {
        self.poll();

        let key = Self::cache_key(&photo.id, max_size);
        if self.cache.contains_key(&key) {
            return self.cache.get_mut(&key);
        }

        if !self.loading.contains(&key) && self.picker.is_some() {
            self.loading.insert(key.clone());
            let bytes = photo.image.clone();
            let sender = self.sender.clone();

            std::thread::spawn(move || {
                if let Ok(img) = image::load_from_memory(&bytes) {
                    let resized = img.resize(
                        max_size,
                        max_size,
                        image::imageops::FilterType::Lanczos3,
                    );
                    let _ = sender.send((key, resized));
                }
            });
        }

        None
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.iter().any(|k| k.starts_with(&format!("{id}#")))
    }

    /// Texture for the live capture preview. Rebuilt in place when a newer
    /// frame arrives; a single slot, so old previews never accumulate.
    pub fn live_protocol(&mut self, frame: &Frame) -> Option<&mut StatefulProtocol> {
        let picker = self.picker.as_mut()?;

        let stale = match &self.live {
            Some((ts, _)) => *ts != frame.timestamp,
            None => true,
        };
        if stale {
            let preview = frame
                .image
                .resize(640, 640, image::imageops::FilterType::Triangle);
            self.live = Some((frame.timestamp, picker.new_resize_protocol(preview)));
        }

        self.live.as_mut().map(|(_, p)| p)
    }

    /// Release textures for photos no longer in the collection.
    pub fn retain(&mut self, ids: &HashSet<String>) {
        self.cache
            .retain(|key, _| key.split('#').next().map(|id| ids.contains(id)).unwrap_or(false));
    }

    /// Release the live-preview texture (capture view teardown).
    pub fn clear_live(&mut self) {
        self.live = None;
    }

    /// Release everything (view teardown).
    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.cache.clear();
        self.loading.clear();
        self.live = None;
    }
}
