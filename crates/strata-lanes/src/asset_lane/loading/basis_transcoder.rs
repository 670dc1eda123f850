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

//! Basis Universal transcoding of KTX2 levels.
//!
//! KTX2 stores Basis Universal payloads either as BasisLZ (ETC1S slices sharing
//! global codebooks) or as raw UASTC blocks. Each level is rewrapped into a
//! single-level `.basis` container and handed to the `basis-universal`
//! transcoder, so levels are transcoded independently of each other.

use super::ktx2_loader_lane::{
    Ktx2Error, Ktx2Header, LevelSource, Transcoder, KHR_DF_MODEL_ETC1S, KHR_DF_MODEL_UASTC,
    SUPERCOMPRESSION_BASIS_LZ, SUPERCOMPRESSION_NONE,
};
use basis_universal::{TranscodeParameters, TranscoderTextureFormat};
use strata_core::renderer::{GraphicsDevice, TextureFormat};

/// GPU formats tried by [`BasisTranscoder::for_device`], best first.
const PREFERRED_TARGETS: [TextureFormat; 3] = [
    TextureFormat::Bc7RgbaUnorm,
    TextureFormat::Astc4x4Unorm,
    TextureFormat::Etc2Rgba8Unorm,
];

/// The two payload encodings Basis Universal defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasisPayload {
    Etc1s,
    Uastc,
}

impl BasisPayload {
    fn of(header: &Ktx2Header) -> Result<Self, Ktx2Error> {
        if header.vk_format != 0 {
            return Err(Ktx2Error::TranscoderUnavailable(
                header.supercompression_scheme,
            ));
        }
        match (header.supercompression_scheme, header.color_model) {
            (SUPERCOMPRESSION_BASIS_LZ, None | Some(KHR_DF_MODEL_ETC1S)) => Ok(Self::Etc1s),
            (SUPERCOMPRESSION_NONE, None | Some(KHR_DF_MODEL_UASTC)) => Ok(Self::Uastc),
            (SUPERCOMPRESSION_BASIS_LZ | SUPERCOMPRESSION_NONE, Some(model)) => Err(
                Ktx2Error::UnsupportedLayout(format!("color model {model} in a Basis payload")),
            ),
            (scheme, _) => Err(Ktx2Error::TranscoderUnavailable(scheme)),
        }
    }
}

/// Transcodes Basis Universal levels into one GPU format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasisTranscoder {
    target: TextureFormat,
}

impl Default for BasisTranscoder {
    /// Transcodes to RGBA8, which every device can sample.
    fn default() -> Self {
        Self::new(TextureFormat::Rgba8Unorm)
    }
}

impl BasisTranscoder {
    /// Creates a transcoder producing `target` blocks.
    pub fn new(target: TextureFormat) -> Self {
        Self { target }
    }

    /// Picks the best block format `device` can sample, falling back to RGBA8.
    pub fn for_device(device: &dyn GraphicsDevice) -> Self {
        let target = PREFERRED_TARGETS
            .into_iter()
            .find(|format| {
                format
                    .required_feature()
                    .is_some_and(|feature| device.supports_feature(feature))
            })
            .unwrap_or(TextureFormat::Rgba8Unorm);
        log::debug!("Basis Universal payloads will be transcoded to {target:?}");
        Self::new(target)
    }

    /// Returns the format levels are transcoded to.
    pub fn target(&self) -> TextureFormat {
        self.target
    }

    fn transcoder_format(&self) -> TranscoderTextureFormat {
        match self.target {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => {
                TranscoderTextureFormat::RGBA32
            }
            TextureFormat::Bc1RgbaUnorm => TranscoderTextureFormat::BC1_RGB,
            TextureFormat::Bc3RgbaUnorm => TranscoderTextureFormat::BC3_RGBA,
            TextureFormat::Bc7RgbaUnorm => TranscoderTextureFormat::BC7_RGBA,
            TextureFormat::Etc2Rgb8Unorm => TranscoderTextureFormat::ETC1_RGB,
            TextureFormat::Etc2Rgba8Unorm => TranscoderTextureFormat::ETC2_RGBA,
            TextureFormat::Astc4x4Unorm => TranscoderTextureFormat::ASTC_4x4_RGBA,
        }
    }
}

impl Transcoder for BasisTranscoder {
    fn target_format(&self, header: &Ktx2Header) -> Result<TextureFormat, Ktx2Error> {
        BasisPayload::of(header)?;
        Ok(self.target)
    }

    fn transcode_level(
        &self,
        header: &Ktx2Header,
        source: LevelSource<'_>,
    ) -> Result<Vec<u8>, Ktx2Error> {
        let level = source.level;
        let container = match BasisPayload::of(header)? {
            BasisPayload::Etc1s => etc1s_container(header, source)?,
            BasisPayload::Uastc => uastc_container(header, source),
        };
        let failed = |message: &str| Ktx2Error::Transcode {
            level,
            message: message.to_string(),
        };

        let mut transcoder = basis_universal::Transcoder::new();
        if !transcoder.validate_header(&container) {
            return Err(failed("invalid Basis Universal header"));
        }
        transcoder
            .prepare_transcoding(&container)
            .map_err(|()| failed("Basis Universal codebooks could not be decoded"))?;

        transcoder
            .transcode_image_level(
                &container,
                self.transcoder_format(),
                TranscodeParameters {
                    image_index: 0,
                    level_index: 0,
                    decode_flags: None,
                    output_row_pitch_in_blocks_or_pixels: None,
                    output_rows_in_pixels: None,
                },
            )
            .map_err(|e| failed(&format!("{e:?}")))
    }

    fn cache_tag(&self) -> String {
        format!("basisu-{:?}", self.target).to_lowercase()
    }
}

// Layout of the `.basis` container, all fields little-endian and unaligned.
const BASIS_SIGNATURE: u64 = 0x4273;
const BASIS_VERSION: u64 = 0x13;
const BASIS_HEADER_LENGTH: usize = 77;
const BASIS_SLICE_DESC_LENGTH: usize = 23;
const BASIS_TEX_FORMAT_ETC1S: u64 = 0;
const BASIS_TEX_FORMAT_UASTC: u64 = 1;
const BASIS_FLAG_ETC1S: u64 = 1;
const BASIS_FLAG_HAS_ALPHA_SLICES: u64 = 4;
const SLICE_FLAG_HAS_ALPHA: u64 = 1;
const BASIS_BLOCK_DIMENSION: u32 = 4;

// Layout of the BasisLZ global data.
const SGD_HEADER_LENGTH: usize = 20;
const SGD_IMAGE_DESC_LENGTH: usize = 20;

/// One slice of the container: the colour or the alpha plane of the level.
struct Slice<'a> {
    has_alpha: bool,
    data: &'a [u8],
}

/// ETC1S codebooks shared by every level of the file.
#[derive(Default)]
struct Codebooks<'a> {
    endpoint_count: u16,
    selector_count: u16,
    endpoints: &'a [u8],
    selectors: &'a [u8],
    tables: &'a [u8],
}

fn sgd_u16(data: &[u8], at: usize) -> Result<u16, Ktx2Error> {
    data.get(at..at + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(Ktx2Error::Truncated("supercompression global data"))
}

fn sgd_u32(data: &[u8], at: usize) -> Result<usize, Ktx2Error> {
    data.get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(|b| u32::from_le_bytes(b) as usize)
        .ok_or(Ktx2Error::Truncated("supercompression global data"))
}

fn sgd_slice(data: &[u8], start: usize, len: usize) -> Result<&[u8], Ktx2Error> {
    data.get(start..start + len)
        .ok_or(Ktx2Error::Truncated("supercompression global data"))
}

fn etc1s_container(header: &Ktx2Header, source: LevelSource<'_>) -> Result<Vec<u8>, Ktx2Error> {
    let global = source.global_data;
    let endpoints_length = sgd_u32(global, 4)?;
    let selectors_length = sgd_u32(global, 8)?;
    let tables_length = sgd_u32(global, 12)?;

    let image_count = header.level_count as usize;
    let codebooks_start = SGD_HEADER_LENGTH + image_count * SGD_IMAGE_DESC_LENGTH;
    let selectors_start = codebooks_start + endpoints_length;
    let tables_start = selectors_start + selectors_length;
    let codebooks = Codebooks {
        endpoint_count: sgd_u16(global, 0)?,
        selector_count: sgd_u16(global, 2)?,
        endpoints: sgd_slice(global, codebooks_start, endpoints_length)?,
        selectors: sgd_slice(global, selectors_start, selectors_length)?,
        tables: sgd_slice(global, tables_start, tables_length)?,
    };

    // Image descriptors are stored level by level.
    let desc = SGD_HEADER_LENGTH + source.level as usize * SGD_IMAGE_DESC_LENGTH;
    let rgb = (sgd_u32(global, desc + 4)?, sgd_u32(global, desc + 8)?);
    let alpha = (sgd_u32(global, desc + 12)?, sgd_u32(global, desc + 16)?);
    let plane = |(offset, length): (usize, usize)| {
        source
            .data
            .get(offset..offset + length)
            .ok_or(Ktx2Error::Truncated("level data"))
    };

    let mut slices = vec![Slice {
        has_alpha: false,
        data: plane(rgb)?,
    }];
    if alpha.1 > 0 {
        slices.push(Slice {
            has_alpha: true,
            data: plane(alpha)?,
        });
    }
    Ok(basis_container(
        BasisPayload::Etc1s,
        source,
        &codebooks,
        &slices,
    ))
}

fn uastc_container(header: &Ktx2Header, source: LevelSource<'_>) -> Vec<u8> {
    let slices = [Slice {
        has_alpha: header.has_alpha,
        data: source.data,
    }];
    basis_container(
        BasisPayload::Uastc,
        source,
        &Codebooks::default(),
        &slices,
    )
}

/// Appends `value` as an unaligned little-endian integer of `width` bytes.
fn put(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

fn put_at(out: &mut [u8], at: usize, value: u16) {
    out[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn basis_container(
    payload: BasisPayload,
    source: LevelSource<'_>,
    codebooks: &Codebooks<'_>,
    slices: &[Slice<'_>],
) -> Vec<u8> {
    let slice_descs_offset = BASIS_HEADER_LENGTH;
    let endpoints_offset = slice_descs_offset + slices.len() * BASIS_SLICE_DESC_LENGTH;
    let selectors_offset = endpoints_offset + codebooks.endpoints.len();
    let tables_offset = selectors_offset + codebooks.selectors.len();
    let slices_offset = tables_offset + codebooks.tables.len();
    let total_length = slices_offset + slices.iter().map(|s| s.data.len()).sum::<usize>();

    let (tex_format, mut flags) = match payload {
        BasisPayload::Etc1s => (BASIS_TEX_FORMAT_ETC1S, BASIS_FLAG_ETC1S),
        BasisPayload::Uastc => (BASIS_TEX_FORMAT_UASTC, 0),
    };
    if slices.iter().any(|s| s.has_alpha) {
        flags |= BASIS_FLAG_HAS_ALPHA_SLICES;
    }
    let has_codebooks = payload == BasisPayload::Etc1s;
    let offset_or_zero = |offset: usize| if has_codebooks { offset as u64 } else { 0 };

    let mut out = Vec::with_capacity(total_length);
    put(&mut out, BASIS_SIGNATURE, 2);
    put(&mut out, BASIS_VERSION, 2);
    put(&mut out, BASIS_HEADER_LENGTH as u64, 2);
    put(&mut out, 0, 2); // header crc, patched below
    put(&mut out, (total_length - BASIS_HEADER_LENGTH) as u64, 4);
    put(&mut out, 0, 2); // data crc, patched below
    put(&mut out, slices.len() as u64, 3);
    put(&mut out, 1, 3); // one image
    put(&mut out, tex_format, 1);
    put(&mut out, flags, 2);
    put(&mut out, 0, 1); // 2D texture
    put(&mut out, 0, 3); // us per frame
    put(&mut out, 0, 4); // reserved
    put(&mut out, 0, 4); // user data 0
    put(&mut out, 0, 4); // user data 1
    put(&mut out, u64::from(codebooks.endpoint_count), 2);
    put(&mut out, offset_or_zero(endpoints_offset), 4);
    put(&mut out, codebooks.endpoints.len() as u64, 3);
    put(&mut out, u64::from(codebooks.selector_count), 2);
    put(&mut out, offset_or_zero(selectors_offset), 4);
    put(&mut out, codebooks.selectors.len() as u64, 3);
    put(&mut out, offset_or_zero(tables_offset), 4);
    put(&mut out, codebooks.tables.len() as u64, 4);
    put(&mut out, slice_descs_offset as u64, 4);
    put(&mut out, 0, 4); // extended data offset
    put(&mut out, 0, 4); // extended data length
    debug_assert_eq!(out.len(), BASIS_HEADER_LENGTH);

    let blocks_x = source.width.div_ceil(BASIS_BLOCK_DIMENSION);
    let blocks_y = source.height.div_ceil(BASIS_BLOCK_DIMENSION);
    let mut data_offset = slices_offset;
    for slice in slices {
        put(&mut out, 0, 3); // image index
        put(&mut out, 0, 1); // level index
        put(
            &mut out,
            if slice.has_alpha { SLICE_FLAG_HAS_ALPHA } else { 0 },
            1,
        );
        put(&mut out, u64::from(source.width), 2);
        put(&mut out, u64::from(source.height), 2);
        put(&mut out, u64::from(blocks_x), 2);
        put(&mut out, u64::from(blocks_y), 2);
        put(&mut out, data_offset as u64, 4);
        put(&mut out, slice.data.len() as u64, 4);
        put(&mut out, u64::from(crc16(slice.data)), 2);
        data_offset += slice.data.len();
    }

    out.extend_from_slice(codebooks.endpoints);
    out.extend_from_slice(codebooks.selectors);
    out.extend_from_slice(codebooks.tables);
    for slice in slices {
        out.extend_from_slice(slice.data);
    }

    // The data crc is covered by the header crc, so it goes first.
    let data_crc = crc16(&out[BASIS_HEADER_LENGTH..]);
    put_at(&mut out, 12, data_crc);
    let header_crc = crc16(&out[8..BASIS_HEADER_LENGTH]);
    put_at(&mut out, 6, header_crc);
    out
}

/// The CRC-16 the `.basis` format uses for its header and data checksums.
fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = !0;
    for &byte in bytes {
        let q = u16::from(byte) ^ (crc >> 8);
        let k = (q >> 4) ^ q;
        crc = (crc << 8) ^ k ^ (k << 5) ^ (k << 12);
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::super::{Ktx2LoaderLane, KTX2_IDENTIFIER};
    use super::*;

    /// A UASTC solid-colour block: mode 8, then the RGBA8 colour.
    fn solid_block(rgba: [u8; 4]) -> [u8; 16] {
        let bits = 0x17u128
            | u128::from(rgba[0]) << 5
            | u128::from(rgba[1]) << 13
            | u128::from(rgba[2]) << 21
            | u128::from(rgba[3]) << 29;
        bits.to_le_bytes()
    }

    /// A single-level 4x4 UASTC file with a data format descriptor.
    fn uastc_file(rgba: [u8; 4]) -> Vec<u8> {
        let dfd_offset = 80 + 24;
        let level_offset = 160u64;
        let mut bytes = KTX2_IDENTIFIER.to_vec();
        for field in [0, 1, 4, 4, 0, 0, 1, 1, 0] {
            bytes.extend_from_slice(&u32::to_le_bytes(field));
        }
        for field in [dfd_offset, 44, 0, 0] {
            bytes.extend_from_slice(&u32::to_le_bytes(field));
        }
        bytes.extend_from_slice(&[0; 16]); // sgd
        for field in [level_offset, 16, 16] {
            bytes.extend_from_slice(&u64::to_le_bytes(field));
        }
        // dfd: total size, descriptor header, UASTC model, one RGB sample
        bytes.extend_from_slice(&44u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&((40u32 << 16) | 2).to_le_bytes());
        bytes.extend_from_slice(&[KHR_DF_MODEL_UASTC, 1, 1, 0, 3, 3, 0, 0]);
        bytes.extend_from_slice(&[16, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 127, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 255, 255, 255]);
        bytes.resize(level_offset as usize, 0);
        bytes.extend_from_slice(&solid_block(rgba));
        bytes
    }

    #[test]
    fn crc_matches_the_basis_checksum() {
        // CRC-16/GENIBUS check value.
        assert_eq!(crc16(b"123456789"), 0xD64E);
    }

    #[test]
    fn uastc_levels_transcode_to_rgba() {
        let lane = Ktx2LoaderLane::with_transcoder(std::sync::Arc::new(BasisTranscoder::default()));
        let image = lane.decode(&uastc_file([0, 255, 0, 255])).unwrap();

        assert_eq!(image.format, TextureFormat::Rgba8Unorm);
        assert_eq!(image.levels.len(), 1);
        assert_eq!((image.levels[0].width, image.levels[0].height), (4, 4));
        assert_eq!(image.levels[0].data, [0, 255, 0, 255].repeat(16));
    }

    #[test]
    fn uastc_levels_transcode_to_block_formats() {
        let lane = Ktx2LoaderLane::with_transcoder(std::sync::Arc::new(BasisTranscoder::new(
            TextureFormat::Bc7RgbaUnorm,
        )));
        let image = lane.decode(&uastc_file([0, 255, 0, 255])).unwrap();

        assert_eq!(image.format, TextureFormat::Bc7RgbaUnorm);
        assert_eq!(image.levels[0].data.len(), 16);
    }

    #[test]
    fn container_header_is_self_consistent() {
        let header = Ktx2Header::parse(&uastc_file([255; 4])).unwrap();
        let block = solid_block([255; 4]);
        let source = LevelSource {
            level: 0,
            width: 4,
            height: 4,
            data: &block,
            global_data: &[],
        };
        let container = uastc_container(&header, source);

        assert_eq!(&container[..2], b"sB");
        assert_eq!(container.len(), BASIS_HEADER_LENGTH + BASIS_SLICE_DESC_LENGTH + 16);
        assert_eq!(
            u16::from_le_bytes([container[6], container[7]]),
            crc16(&container[8..BASIS_HEADER_LENGTH])
        );
        assert_eq!(&container[container.len() - 16..], &block);
    }

    #[test]
    fn non_basis_payloads_are_refused() {
        let mut header = Ktx2Header::parse(&uastc_file([255; 4])).unwrap();
        header.supercompression_scheme = 2;
        assert!(matches!(
            BasisTranscoder::default().target_format(&header),
            Err(Ktx2Error::TranscoderUnavailable(2))
        ));
    }
}
