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

//! The declarative asset description consumed by the texture pipeline.
//!
//! The layout mirrors the glTF 2.0 JSON document: sampler fields keep their raw
//! OpenGL enum values and texture extensions are addressed by their registry
//! names. Only the parts the texture pipeline reads are modelled; unknown fields
//! are ignored during deserialization.

use serde::{Deserialize, Serialize};

/// A streamed model's resource declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescription {
    /// Image slots, referenced by index from [`TextureEntry`].
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    /// Textures pairing an image source with an optional sampler.
    #[serde(default)]
    pub textures: Vec<TextureEntry>,
    /// Sampler states, referenced by index from [`TextureEntry`].
    #[serde(default)]
    pub samplers: Vec<SamplerEntry>,
    /// Materials whose channels reference textures.
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl AssetDescription {
    /// Parses a description from its JSON representation.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns the texture entry at `index`, if it exists.
    pub fn texture(&self, index: usize) -> Option<&TextureEntry> {
        self.textures.get(index)
    }

    /// Returns the image entry at `index`, if it exists.
    pub fn image(&self, index: usize) -> Option<&ImageEntry> {
        self.images.get(index)
    }

    /// Returns the sampler entry at `index`, if it exists.
    pub fn sampler(&self, index: usize) -> Option<&SamplerEntry> {
        self.samplers.get(index)
    }
}

/// One image slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    /// Location of the image, absolute, relative to the base resource, or a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Declared media type (e.g. `image/png`, `image/ktx2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Index of a buffer view holding the image bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A texture declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureEntry {
    /// The base image source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    /// The sampler applied to this texture. `None` means repeat wrapping with
    /// linear filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<usize>,
    /// Alternative image sources for optional formats.
    #[serde(default)]
    pub extensions: TextureExtensions,
}

/// Extension-provided alternative image sources of a texture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureExtensions {
    /// Block-compressed (KTX2 / Basis Universal) source.
    #[serde(
        rename = "KHR_texture_basisu",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub khr_texture_basisu: Option<ExtensionSource>,
    /// WebP source.
    #[serde(
        rename = "EXT_texture_webp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ext_texture_webp: Option<ExtensionSource>,
}

/// The image index an extension points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSource {
    /// Index into [`AssetDescription::images`].
    pub source: usize,
}

/// A sampler declaration, carrying raw OpenGL enum values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerEntry {
    /// Magnification filter (`9728` nearest, `9729` linear).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<u32>,
    /// Minification filter, including the four mipmapped variants (`9984`–`9987`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<u32>,
    /// Horizontal wrap mode (`33071` clamp, `33648` mirrored repeat, `10497` repeat).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<u32>,
    /// Vertical wrap mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<u32>,
}

/// A reference from a material channel to a texture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    /// Index into [`AssetDescription::textures`].
    pub index: usize,
    /// Texture coordinate set used by this channel.
    #[serde(default)]
    pub tex_coord: u32,
    /// Per-reference extensions.
    #[serde(default)]
    pub extensions: TextureInfoExtensions,
}

impl TextureInfo {
    /// Creates a reference to the texture at `index` on coordinate set zero.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Returns `true` if the reference carries a UV transform.
    pub fn uses_texture_transform(&self) -> bool {
        self.extensions.khr_texture_transform.is_some()
    }
}

/// Extensions attached to a [`TextureInfo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureInfoExtensions {
    /// UV offset/rotation/scale. Its content is not interpreted here.
    #[serde(
        rename = "KHR_texture_transform",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub khr_texture_transform: Option<serde_json::Value>,
}

/// The texture channels a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialChannel {
    /// Base color (PBR metallic-roughness).
    BaseColor,
    /// Metallic-roughness (PBR metallic-roughness).
    MetallicRoughness,
    /// Tangent-space normals.
    Normal,
    /// Ambient occlusion.
    Occlusion,
    /// Emission.
    Emissive,
}

impl MaterialChannel {
    /// Every channel, in declaration order.
    pub const ALL: [MaterialChannel; 5] = [
        MaterialChannel::BaseColor,
        MaterialChannel::MetallicRoughness,
        MaterialChannel::Normal,
        MaterialChannel::Occlusion,
        MaterialChannel::Emissive,
    ];
}

/// A material declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Metallic-roughness parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    /// Normal map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<TextureInfo>,
    /// Occlusion map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<TextureInfo>,
    /// Emissive map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureInfo>,
}

/// Metallic-roughness texture references of a [`Material`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    /// Base color map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    /// Metallic-roughness map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Material {
    /// Returns the texture reference bound to `channel`, if any.
    pub fn texture_info(&self, channel: MaterialChannel) -> Option<&TextureInfo> {
        match channel {
            MaterialChannel::BaseColor => self
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_texture.as_ref()),
            MaterialChannel::MetallicRoughness => self
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.metallic_roughness_texture.as_ref()),
            MaterialChannel::Normal => self.normal_texture.as_ref(),
            MaterialChannel::Occlusion => self.occlusion_texture.as_ref(),
            MaterialChannel::Emissive => self.emissive_texture.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"{
        "images": [{ "uri": "image.png" }, { "uri": "image.ktx2", "mimeType": "image/ktx2" }],
        "textures": [
            { "source": 0 },
            { "source": 0, "sampler": 0, "extensions": { "KHR_texture_basisu": { "source": 1 } } }
        ],
        "samplers": [{ "magFilter": 9728, "minFilter": 9984, "wrapS": 10497, "wrapT": 33071 }],
        "materials": [{
            "emissiveTexture": { "index": 0 },
            "occlusionTexture": { "index": 1, "extensions": { "KHR_texture_transform": { "scale": [2, 2] } } }
        }],
        "asset": { "version": "2.0" }
    }"#;

    #[test]
    fn parses_texture_declarations() {
        let description = AssetDescription::from_json(DESCRIPTION.as_bytes()).unwrap();

        assert_eq!(description.images.len(), 2);
        assert_eq!(
            description.images[1].mime_type.as_deref(),
            Some("image/ktx2")
        );
        assert_eq!(description.textures[0].sampler, None);
        assert_eq!(
            description.textures[1].extensions.khr_texture_basisu,
            Some(ExtensionSource { source: 1 })
        );
        assert_eq!(description.samplers[0].min_filter, Some(9984));
        assert_eq!(description.samplers[0].wrap_t, Some(33071));
    }

    #[test]
    fn resolves_material_channels() {
        let description = AssetDescription::from_json(DESCRIPTION.as_bytes()).unwrap();
        let material = &description.materials[0];

        let emissive = material.texture_info(MaterialChannel::Emissive).unwrap();
        assert_eq!(emissive.index, 0);
        assert!(!emissive.uses_texture_transform());

        let occlusion = material.texture_info(MaterialChannel::Occlusion).unwrap();
        assert_eq!(occlusion.index, 1);
        assert!(occlusion.uses_texture_transform());

        assert!(material.texture_info(MaterialChannel::BaseColor).is_none());
    }
}
