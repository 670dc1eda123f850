// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strata_agents::{
    FrameState, JobScheduler, JobSchedulerConfig, TextureLoadError, TextureLoader,
    TextureLoaderOptions,
};
use strata_core::asset::{AssetDescription, TextureInfo};
use strata_core::io::{FetchError, Resource, ResourceFetcher};
use strata_core::renderer::GraphicsDevice;
use strata_core::SupportedImageFormats;
use strata_data::ResourceCache;
use strata_infra::HeadlessDevice;
use strata_lanes::asset_lane::KTX2_IDENTIFIER;
use tokio::sync::Notify;
use url::Url;

pub const ASSET_URL: &str = "https://example.com/models/model.gltf";
pub const BASE_URL: &str = "https://example.com/models/";

enum Response {
    Bytes(Vec<u8>),
    Status(u16, &'static str),
}

/// Serves canned responses and counts requests. Unknown URLs answer `404 Not Found`.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Response>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("fetches", &self.fetches)
            .finish()
    }
}

impl MockFetcher {
    pub fn respond(&self, path: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{BASE_URL}{path}"), Response::Bytes(bytes));
    }

    pub fn fail(&self, path: &str, code: u16, reason: &'static str) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{BASE_URL}{path}"), Response::Status(code, reason));
    }

    /// Holds every following request until the returned `Notify` is signalled.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.responses.lock().unwrap().get(url.as_str()) {
            Some(Response::Bytes(bytes)) => Ok(bytes.clone()),
            Some(Response::Status(code, reason)) => Err(FetchError::Status {
                code: *code,
                reason: reason.to_string(),
            }),
            None => Err(FetchError::Status {
                code: 404,
                reason: "Not Found".to_string(),
            }),
        }
    }
}

/// Everything a loader needs, wired to a headless device.
pub struct Harness {
    pub cache: Arc<ResourceCache>,
    pub fetcher: Arc<MockFetcher>,
    pub device: Arc<HeadlessDevice>,
    pub gpu: Arc<dyn GraphicsDevice>,
    pub scheduler: JobScheduler,
    pub formats: SupportedImageFormats,
    frame_number: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_scheduler(JobSchedulerConfig::default())
    }

    pub fn with_scheduler(config: JobSchedulerConfig) -> Self {
        let device = Arc::new(HeadlessDevice::new());
        Self {
            cache: Arc::new(ResourceCache::new()),
            fetcher: Arc::new(MockFetcher::default()),
            gpu: device.clone(),
            device,
            scheduler: JobScheduler::new(&config),
            formats: SupportedImageFormats::new(true, false),
            frame_number: 0,
        }
    }

    pub fn resource(&self, url: &str) -> Resource {
        Resource::parse(url, self.fetcher.clone()).unwrap()
    }

    pub fn options(&self, description: &Arc<AssetDescription>, index: usize) -> TextureLoaderOptions {
        self.options_for(description, TextureInfo::new(index))
    }

    pub fn options_for(
        &self,
        description: &Arc<AssetDescription>,
        texture_info: TextureInfo,
    ) -> TextureLoaderOptions {
        TextureLoaderOptions {
            resource_cache: Some(self.cache.clone()),
            asset_description: Some(description.clone()),
            texture_info: Some(texture_info),
            asset_resource: Some(self.resource(ASSET_URL)),
            base_resource: Some(self.resource(BASE_URL)),
            supported_image_formats: Some(self.formats),
            ..Default::default()
        }
    }

    /// Starts a tick and polls `loader` once.
    pub fn tick(&mut self, loader: &TextureLoader) -> Result<bool, TextureLoadError> {
        self.scheduler.reset_budgets();
        self.frame_number += 1;
        let mut frame = FrameState::new(self.frame_number, &self.gpu, &mut self.scheduler);
        loader.process(&mut frame)
    }

    /// Polls `loader` once on a tick where the scheduler refuses every job.
    pub fn starved_tick(&mut self, loader: &TextureLoader) -> Result<bool, TextureLoadError> {
        self.scheduler.reset_budgets();
        self.scheduler.disable_this_frame();
        self.frame_number += 1;
        let mut frame = FrameState::new(self.frame_number, &self.gpu, &mut self.scheduler);
        loader.process(&mut frame)
    }
}

pub fn description(json: &str) -> Arc<AssetDescription> {
    Arc::new(AssetDescription::from_json(json.as_bytes()).unwrap())
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Builds an uncompressed-container BC7 KTX2 file whose levels each fit one block.
pub fn ktx2_bc7(width: u32, height: u32, levels: u32) -> Vec<u8> {
    let mut bytes = KTX2_IDENTIFIER.to_vec();
    for field in [145, 1, width, height, 0, 0, 1, levels, 0] {
        bytes.extend_from_slice(&u32::to_le_bytes(field));
    }
    bytes.extend_from_slice(&[0; 32]); // dfd, kvd, sgd
    let data_start = 80 + u64::from(levels) * 24;
    for level in 0..u64::from(levels) {
        for field in [data_start + level * 16, 16, 16] {
            bytes.extend_from_slice(&u64::to_le_bytes(field));
        }
    }
    for level in 0..levels {
        bytes.extend_from_slice(&[level as u8; 16]);
    }
    bytes
}

/// Builds a 4x4 Basis Universal (UASTC) KTX2 file holding one solid-colour block.
pub fn ktx2_uastc_solid(rgba: [u8; 4]) -> Vec<u8> {
    let level_offset = 160u64;
    let mut bytes = KTX2_IDENTIFIER.to_vec();
    for field in [0, 1, 4, 4, 0, 0, 1, 1, 0] {
        bytes.extend_from_slice(&u32::to_le_bytes(field));
    }
    for field in [104, 44, 0, 0] {
        bytes.extend_from_slice(&u32::to_le_bytes(field));
    }
    bytes.extend_from_slice(&[0; 16]); // sgd
    for field in [level_offset, 16, 16] {
        bytes.extend_from_slice(&u64::to_le_bytes(field));
    }
    // dfd: UASTC colour model, one RGB sample
    bytes.extend_from_slice(&44u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&((40u32 << 16) | 2).to_le_bytes());
    bytes.extend_from_slice(&[166, 1, 1, 0, 3, 3, 0, 0]);
    bytes.extend_from_slice(&[16, 0, 0, 0, 0, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 127, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 255, 255, 255]);
    bytes.resize(level_offset as usize, 0);

    // Mode 8 (solid colour) followed by the RGBA8 colour.
    let block = 0x17u128
        | u128::from(rgba[0]) << 5
        | u128::from(rgba[1]) << 13
        | u128::from(rgba[2]) << 21
        | u128::from(rgba[3]) << 29;
    bytes.extend_from_slice(&block.to_le_bytes());
    bytes
}
