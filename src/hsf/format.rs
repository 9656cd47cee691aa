//! On-disk layout of HSF files: the header, the section table and the fixed
//! size record of every section.
//!
//! Records here are plain `#[repr(C)]` mirrors of the file layout. They are read
//! through [`crate::data::image::WorkingImage`], which brings them into host
//! byte order; all offsets are still file-relative `u32`s at that point.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use rootcause::Report;
use winnow::Parser;
use winnow::binary::u32 as any_u32;
use winnow::combinator::repeat;
use winnow::token::take;

use crate::data::ByteOrder;
use crate::data::endian::{Normalize, NormalizeTagged, Normalizer, normalize_fields, swap_chunks};
use crate::data::parser_utils::WResult;
use crate::error::LoadError;
use crate::recognized::Recognized;

pub const MAGIC: &[u8; 4] = b"HSFV";
pub const SUPPORTED_VERSION: u32 = 37;
pub const SECTION_COUNT: usize = 21;
pub const HEADER_SIZE: usize = 8 + SECTION_COUNT * 8;

pub const SCENE_SIZE: usize = 0x10;
pub const BUFFER_SIZE: usize = 0x0C;
pub const FACE_SIZE: usize = 0x30;
pub const OBJECT_SIZE: usize = 0x144;
pub const ENVELOPE_SIZE: usize = 0x24;
pub const SINGLE_BINDING_SIZE: usize = 0x0C;
pub const DUAL_BINDING_SIZE: usize = 0x10;
pub const DUAL_WEIGHT_SIZE: usize = 0x0C;
pub const MULTI_BINDING_SIZE: usize = 0x10;
pub const MULTI_WEIGHT_SIZE: usize = 0x08;
pub const SKELETON_SIZE: usize = 0x28;
pub const PART_SIZE: usize = 0x0C;
pub const CLUSTER_SIZE: usize = 0xA0;
pub const SHAPE_SIZE: usize = 0x0C;
pub const MAP_ATTRIBUTE_SIZE: usize = 0x18;
pub const MATRIX_HEADER_SIZE: usize = 0x0C;
pub const PALETTE_SIZE: usize = 0x10;
pub const BITMAP_SIZE: usize = 0x20;
pub const ATTRIBUTE_SIZE: usize = 0x84;
pub const MATERIAL_SIZE: usize = 0x3C;
pub const MOTION_SIZE: usize = 0x10;
pub const TRACK_SIZE: usize = 0x10;

/// Number of morph target weights stored inline in a mesh object.
pub const MORPH_WEIGHT_COUNT: usize = 33;
/// Face kind marking a strip record.
pub const FACE_KIND_STRIP: i16 = 4;
/// Size of one strip entry: position, normal, color and texcoord indices.
pub const STRIP_QUAD_SIZE: usize = 8;

/// One logical table of the file, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Section {
    Scene,
    Color,
    Material,
    Attribute,
    Vertex,
    Normal,
    TexCoord,
    Face,
    Object,
    Bitmap,
    Palette,
    Motion,
    Envelope,
    Skeleton,
    Part,
    Cluster,
    Shape,
    MapAttribute,
    Matrix,
    Symbol,
    String,
}

impl Section {
    pub const ALL: [Section; SECTION_COUNT] = [
        Section::Scene,
        Section::Color,
        Section::Material,
        Section::Attribute,
        Section::Vertex,
        Section::Normal,
        Section::TexCoord,
        Section::Face,
        Section::Object,
        Section::Bitmap,
        Section::Palette,
        Section::Motion,
        Section::Envelope,
        Section::Skeleton,
        Section::Part,
        Section::Cluster,
        Section::Shape,
        Section::MapAttribute,
        Section::Matrix,
        Section::Symbol,
        Section::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Scene => "scene",
            Section::Color => "color",
            Section::Material => "material",
            Section::Attribute => "attribute",
            Section::Vertex => "vertex",
            Section::Normal => "normal",
            Section::TexCoord => "texcoord",
            Section::Face => "face",
            Section::Object => "object",
            Section::Bitmap => "bitmap",
            Section::Palette => "palette",
            Section::Motion => "motion",
            Section::Envelope => "envelope",
            Section::Skeleton => "skeleton",
            Section::Part => "part",
            Section::Cluster => "cluster",
            Section::Shape => "shape",
            Section::MapAttribute => "map attribute",
            Section::Matrix => "matrix",
            Section::Symbol => "symbol",
            Section::String => "string",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// (offset, count) pair locating one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SectionEntry {
    pub offset: u32,
    pub count: u32,
}

impl SectionEntry {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    pub fn count(&self) -> usize {
        self.count as usize
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u32,
    pub sections: [SectionEntry; SECTION_COUNT],
}

impl Header {
    pub fn entry(&self, section: Section) -> SectionEntry {
        self.sections[section as usize]
    }

    pub fn count(&self, section: Section) -> usize {
        self.entry(section).count()
    }
}

// ---------------------------------------------------------------------------
// Header parsing
// ---------------------------------------------------------------------------

fn parse_section_entry(order: ByteOrder) -> impl FnMut(&mut &[u8]) -> WResult<SectionEntry> {
    move |input: &mut &[u8]| {
        let offset = any_u32(order.winnow()).parse_next(input)?;
        let count = any_u32(order.winnow()).parse_next(input)?;
        Ok(SectionEntry { offset, count })
    }
}

struct RawHeader<'a> {
    magic: &'a [u8],
    version: &'a [u8],
    sections: Vec<SectionEntry>,
}

fn parse_raw_header<'a>(input: &mut &'a [u8], order: ByteOrder) -> WResult<RawHeader<'a>> {
    let magic = take(4usize).parse_next(input)?;
    let version = take(4usize).parse_next(input)?;
    let sections = repeat(SECTION_COUNT, parse_section_entry(order)).parse_next(input)?;
    Ok(RawHeader {
        magic,
        version,
        sections,
    })
}

/// Parse the file header. The version is three ASCII digits after the magic,
/// followed by a NUL.
pub fn parse_header(
    data: &[u8],
    order: ByteOrder,
    check_magic: bool,
) -> Result<Header, Report<LoadError>> {
    if data.len() < HEADER_SIZE {
        return Err(Report::new(LoadError::OutOfBounds {
            offset: 0,
            need: HEADER_SIZE,
            have: data.len(),
        }));
    }

    let raw = {
        let input = &mut &data[..];
        parse_raw_header(input, order)
            .map_err(|e| Report::new(LoadError::ParseError(format!("header: {e}"))))?
    };

    let mut magic = [0u8; 4];
    magic.copy_from_slice(raw.magic);
    let version = std::str::from_utf8(&raw.version[..3])
        .ok()
        .and_then(|digits| digits.parse::<u32>().ok());

    let version = if check_magic {
        if &magic != MAGIC {
            return Err(Report::new(LoadError::BadMagic { found: magic }));
        }
        match version {
            Some(SUPPORTED_VERSION) => SUPPORTED_VERSION,
            Some(other) => return Err(Report::new(LoadError::UnsupportedVersion(other))),
            None => {
                return Err(Report::new(LoadError::ParseError(format!(
                    "version digits {:02X?}",
                    raw.version
                ))));
            }
        }
    } else {
        version.unwrap_or(0)
    };

    let mut sections = [SectionEntry::default(); SECTION_COUNT];
    sections.copy_from_slice(&raw.sections);

    Ok(Header {
        magic,
        version,
        sections,
    })
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Scene object variant, stored as a `u32` in each object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ObjectKind {
    Null1,
    Replica,
    Mesh,
    Root,
    Joint,
    Null2,
    Null3,
    None1,
    None2,
    Map,
}

impl ObjectKind {
    pub fn from_raw(raw: u32) -> Recognized<ObjectKind, u32> {
        let kind = match raw {
            0 => ObjectKind::Null1,
            1 => ObjectKind::Replica,
            2 => ObjectKind::Mesh,
            3 => ObjectKind::Root,
            4 => ObjectKind::Joint,
            5 => ObjectKind::Null2,
            6 => ObjectKind::Null3,
            7 => ObjectKind::None1,
            8 => ObjectKind::None2,
            9 => ObjectKind::Map,
            other => return Recognized::Unknown(other),
        };
        Recognized::Known(kind)
    }
}

/// What a motion track animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TrackKind {
    Transform,
    Morph,
    Cluster,
    ClusterWeight,
    Material,
    Attribute,
}

impl TrackKind {
    pub fn from_raw(raw: u8) -> Recognized<TrackKind, u8> {
        let kind = match raw {
            2 => TrackKind::Transform,
            3 => TrackKind::Morph,
            5 => TrackKind::Cluster,
            6 => TrackKind::ClusterWeight,
            9 => TrackKind::Material,
            10 => TrackKind::Attribute,
            other => return Recognized::Unknown(other),
        };
        Recognized::Known(kind)
    }
}

/// How a track's keyframe payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CurveKind {
    Step,
    Linear,
    Bezier,
    Bitmap,
    Constant,
}

impl CurveKind {
    pub fn from_raw(raw: u16) -> Recognized<CurveKind, u16> {
        let kind = match raw {
            0 => CurveKind::Step,
            1 => CurveKind::Linear,
            2 => CurveKind::Bezier,
            3 => CurveKind::Bitmap,
            4 => CurveKind::Constant,
            other => return Recognized::Unknown(other),
        };
        Recognized::Known(kind)
    }
}

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

normalize_fields!(Vec2 { x, y });

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

normalize_fields!(Vec3 { x, y, z });

/// Position, rotation (Euler degrees) and scale.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Vec3,
    pub scale: Vec3,
}

normalize_fields!(Transform { pos, rot, scale });

/// Row-major 3x4 affine matrix.
pub type Matrix3x4 = [[f32; 4]; 3];

// ---------------------------------------------------------------------------
// Section records
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneRecord {
    pub fog_kind: u32,
    pub start: f32,
    pub end: f32,
    pub color: [u8; 4],
}

normalize_fields!(SceneRecord {
    fog_kind,
    start,
    end,
    color
});

/// Header shared by the color, vertex, normal, texcoord and face sections.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BufferRecord {
    pub name: u32,
    pub count: i32,
    pub data: u32,
}

normalize_fields!(BufferRecord { name, count, data });

impl BufferRecord {
    pub fn len(&self) -> usize {
        self.count.max(0) as usize
    }
}

/// A face. Kind 4 is a strip whose last index row is replaced by the strip's
/// quad count and payload index; every other kind is a fixed 4x4 table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FaceRecord {
    pub kind: i16,
    pub material: i16,
    pub rows: [[i16; 4]; 3],
    pub tail: [u8; 8],
    pub nbt: [f32; 3],
}

impl FaceRecord {
    pub fn is_strip(&self) -> bool {
        self.kind == FACE_KIND_STRIP
    }

    /// Fourth index row of a fixed face.
    pub fn last_row(&self) -> [i16; 4] {
        let mut row = [0i16; 4];
        for (slot, chunk) in row.iter_mut().zip(self.tail.chunks_exact(2)) {
            *slot = i16::from_ne_bytes([chunk[0], chunk[1]]);
        }
        row
    }

    /// Number of quads in a strip's payload.
    pub fn strip_count(&self) -> u32 {
        u32::from_ne_bytes([self.tail[0], self.tail[1], self.tail[2], self.tail[3]])
    }

    /// Index of the strip's first quad in the shared strip payload.
    pub fn strip_data(&self) -> u32 {
        u32::from_ne_bytes([self.tail[4], self.tail[5], self.tail[6], self.tail[7]])
    }
}

impl NormalizeTagged for FaceRecord {
    type Tag = i16;

    fn normalize_tag(&mut self, n: &Normalizer) -> i16 {
        self.kind.normalize(n);
        self.kind
    }

    fn normalize_tagged(&mut self, kind: i16, n: &Normalizer) {
        self.material.normalize(n);
        self.rows.normalize(n);
        self.nbt.normalize(n);
        if kind == FACE_KIND_STRIP {
            swap_chunks(&mut self.tail, 4, n);
        } else {
            swap_chunks(&mut self.tail, 2, n);
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectRecord {
    pub name: u32,
    pub kind: u32,
    pub const_data: u32,
    pub flags: u32,
    pub parent: u32,
    pub children_count: u32,
    pub children: u32,
    pub base: Transform,
    pub current: Transform,
    /// Mesh: bounds min, bounds max, base morph, morph weights (all `f32`).
    /// Replica: index of the mirrored object in the first word.
    pub payload: [u32; 40],
    pub face: u32,
    pub vertex: u32,
    pub normal: u32,
    pub color: u32,
    pub texcoord: u32,
    pub material: u32,
    pub attribute: u32,
    pub unk_120: [u8; 2],
    pub shape_kind: u8,
    pub unk_123: u8,
    pub vertex_shape_count: u32,
    pub vertex_shape: u32,
    pub cluster_count: u32,
    pub cluster: u32,
    pub envelope_count: u32,
    pub envelope: u32,
    pub vtx_top: u32,
    pub norm_top: u32,
}

impl ObjectRecord {
    fn payload_f32(&self, index: usize) -> f32 {
        f32::from_bits(self.payload[index])
    }

    pub fn mesh_min(&self) -> Vec3 {
        Vec3 {
            x: self.payload_f32(0),
            y: self.payload_f32(1),
            z: self.payload_f32(2),
        }
    }

    pub fn mesh_max(&self) -> Vec3 {
        Vec3 {
            x: self.payload_f32(3),
            y: self.payload_f32(4),
            z: self.payload_f32(5),
        }
    }

    pub fn base_morph(&self) -> f32 {
        self.payload_f32(6)
    }

    pub fn morph_weights(&self) -> Vec<f32> {
        self.payload[7..7 + MORPH_WEIGHT_COUNT]
            .iter()
            .map(|bits| f32::from_bits(*bits))
            .collect()
    }

    pub fn replica(&self) -> u32 {
        self.payload[0]
    }
}

impl NormalizeTagged for ObjectRecord {
    type Tag = u32;

    fn normalize_tag(&mut self, n: &Normalizer) -> u32 {
        self.kind.normalize(n);
        self.kind
    }

    fn normalize_tagged(&mut self, kind: u32, n: &Normalizer) {
        self.name.normalize(n);
        self.const_data.normalize(n);
        self.flags.normalize(n);
        self.parent.normalize(n);
        self.children_count.normalize(n);
        self.children.normalize(n);
        self.base.normalize(n);
        self.current.normalize(n);
        match ObjectKind::from_raw(kind) {
            Recognized::Known(ObjectKind::Mesh) => self.payload.normalize(n),
            Recognized::Known(ObjectKind::Replica) => self.payload[0].normalize(n),
            _ => {}
        }
        self.face.normalize(n);
        self.vertex.normalize(n);
        self.normal.normalize(n);
        self.color.normalize(n);
        self.texcoord.normalize(n);
        self.material.normalize(n);
        self.attribute.normalize(n);
        self.vertex_shape_count.normalize(n);
        self.vertex_shape.normalize(n);
        self.cluster_count.normalize(n);
        self.cluster.normalize(n);
        self.envelope_count.normalize(n);
        self.envelope.normalize(n);
        self.vtx_top.normalize(n);
        self.norm_top.normalize(n);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct EnvelopeRecord {
    pub name: u32,
    pub single_data: u32,
    pub dual_data: u32,
    pub multi_data: u32,
    pub single_count: u32,
    pub dual_count: u32,
    pub multi_count: u32,
    pub vertex_count: u32,
    pub copy_count: u32,
}

normalize_fields!(EnvelopeRecord {
    name,
    single_data,
    dual_data,
    multi_data,
    single_count,
    dual_count,
    multi_count,
    vertex_count,
    copy_count
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SingleBindingRecord {
    pub target: u32,
    pub pos: u16,
    pub pos_count: u16,
    pub normal: u16,
    pub normal_count: u16,
}

normalize_fields!(SingleBindingRecord {
    target,
    pos,
    pos_count,
    normal,
    normal_count
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DualBindingRecord {
    pub target1: u32,
    pub target2: u32,
    pub weight_count: u32,
    pub weight: u32,
}

normalize_fields!(DualBindingRecord {
    target1,
    target2,
    weight_count,
    weight
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DualWeightRecord {
    pub weight: f32,
    pub pos: u16,
    pub pos_count: u16,
    pub normal: u16,
    pub normal_count: u16,
}

normalize_fields!(DualWeightRecord {
    weight,
    pos,
    pos_count,
    normal,
    normal_count
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MultiBindingRecord {
    pub weight_count: u32,
    pub pos: u16,
    pub pos_count: u16,
    pub normal: u16,
    pub normal_count: u16,
    pub weight: u32,
}

normalize_fields!(MultiBindingRecord {
    weight_count,
    pos,
    pos_count,
    normal,
    normal_count,
    weight
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MultiWeightRecord {
    pub target: u32,
    pub value: f32,
}

normalize_fields!(MultiWeightRecord { target, value });

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkeletonRecord {
    pub name: u32,
    pub transform: Transform,
}

normalize_fields!(SkeletonRecord { name, transform });

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PartRecord {
    pub name: u32,
    pub count: u32,
    pub vertex: u32,
}

normalize_fields!(PartRecord {
    name,
    count,
    vertex
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ClusterRecord {
    pub names: [u32; 2],
    pub target_name: u32,
    pub part: u32,
    pub index: f32,
    pub weights: [f32; 32],
    pub adjusted: u8,
    pub flags: u8,
    pub kind: u16,
    pub vertex_count: u32,
    pub vertex: u32,
}

normalize_fields!(ClusterRecord {
    names,
    target_name,
    part,
    index,
    weights,
    adjusted,
    flags,
    kind,
    vertex_count,
    vertex
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShapeRecord {
    pub name: u32,
    /// Only the second half carries the vertex buffer count.
    pub counts: [u16; 2],
    pub vertex: u32,
}

normalize_fields!(ShapeRecord {
    name,
    counts,
    vertex
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MapAttributeRecord {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
    pub data: u32,
    pub data_len: u32,
}

normalize_fields!(MapAttributeRecord {
    min_x,
    min_z,
    max_x,
    max_z,
    data,
    data_len
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MatrixHeaderRecord {
    pub base_index: u32,
    pub count: u32,
    pub data: u32,
}

normalize_fields!(MatrixHeaderRecord {
    base_index,
    count,
    data
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PaletteRecord {
    pub name: u32,
    pub kind: i32,
    pub count: u32,
    pub data: u32,
}

normalize_fields!(PaletteRecord {
    name,
    kind,
    count,
    data
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BitmapRecord {
    pub name: u32,
    pub max_lod: u32,
    pub format: u8,
    pub bits_per_pixel: u8,
    pub width: i16,
    pub height: i16,
    pub palette_size: i16,
    pub tint: [u8; 4],
    pub palette: u32,
    pub unk_18: u32,
    pub data: u32,
}

normalize_fields!(BitmapRecord {
    name,
    max_lod,
    format,
    bits_per_pixel,
    width,
    height,
    palette_size,
    tint,
    palette,
    unk_18,
    data
});

impl BitmapRecord {
    /// Size of the top mip level in bytes, padded to whole GX tiles. Further
    /// mip levels are not included.
    pub fn pixel_bytes(&self) -> usize {
        let (tile_w, tile_h) = match self.bits_per_pixel {
            4 => (8, 8),
            8 => (8, 4),
            16 | 32 => (4, 4),
            _ => (1, 1),
        };
        let width = (self.width.max(0) as usize).next_multiple_of(tile_w);
        let height = (self.height.max(0) as usize).next_multiple_of(tile_h);
        (width * height * self.bits_per_pixel as usize).div_ceil(8)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AttributeRecord {
    pub name: u32,
    pub unk_04: u32,
    pub unk_08: [u8; 4],
    pub unk_0c: f32,
    pub unk_10: [u8; 4],
    pub unk_14: f32,
    pub unk_18: [u8; 8],
    pub unk_20: f32,
    pub unk_24: [u8; 4],
    pub unk_28: [f32; 4],
    pub unk_38: [u8; 44],
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub unk_6c: [u8; 12],
    pub unk_78: u32,
    pub flags: u32,
    pub bitmap: u32,
}

normalize_fields!(AttributeRecord {
    name,
    unk_04,
    unk_08,
    unk_0c,
    unk_10,
    unk_14,
    unk_18,
    unk_20,
    unk_24,
    unk_28,
    unk_38,
    wrap_s,
    wrap_t,
    unk_6c,
    unk_78,
    flags,
    bitmap
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialRecord {
    pub name: u32,
    pub unk_04: [u8; 4],
    pub pass: u16,
    pub vertex_mode: u8,
    pub lit_color: [u8; 3],
    pub color: [u8; 3],
    pub shadow_color: [u8; 3],
    pub hilite_scale: f32,
    pub unk_18: f32,
    pub inv_alpha: f32,
    pub unk_20: [f32; 2],
    pub ref_alpha: f32,
    pub unk_2c: f32,
    pub flags: u32,
    pub attribute_count: u32,
    pub attributes: u32,
}

normalize_fields!(MaterialRecord {
    name,
    unk_04,
    pass,
    vertex_mode,
    lit_color,
    color,
    shadow_color,
    hilite_scale,
    unk_18,
    inv_alpha,
    unk_20,
    ref_alpha,
    unk_2c,
    flags,
    attribute_count,
    attributes
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MotionRecord {
    pub name: u32,
    pub track_count: i32,
    pub track: u32,
    pub length: f32,
}

normalize_fields!(MotionRecord {
    name,
    track_count,
    track,
    length
});

/// A motion track. `param` is an `i32` for cluster weight tracks and an
/// (`i16` param, `u16` channel) pair otherwise; `data` is an inline `f32` for
/// constant curves and a payload offset otherwise.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TrackRecord {
    pub kind: u8,
    pub start: u8,
    pub target: u16,
    pub param: [u8; 4],
    pub curve: u16,
    pub keyframe_count: u16,
    pub data: u32,
}

impl TrackRecord {
    pub fn param_word(&self) -> i32 {
        i32::from_ne_bytes(self.param)
    }

    pub fn param_pair(&self) -> (i16, u16) {
        (
            i16::from_ne_bytes([self.param[0], self.param[1]]),
            u16::from_ne_bytes([self.param[2], self.param[3]]),
        )
    }

    pub fn constant(&self) -> f32 {
        f32::from_bits(self.data)
    }
}

impl NormalizeTagged for TrackRecord {
    /// (track kind, curve kind)
    type Tag = (u8, u16);

    fn normalize_tag(&mut self, n: &Normalizer) -> (u8, u16) {
        self.kind.normalize(n);
        self.curve.normalize(n);
        (self.kind, self.curve)
    }

    fn normalize_tagged(&mut self, (kind, _curve): (u8, u16), n: &Normalizer) {
        self.start.normalize(n);
        self.target.normalize(n);
        self.keyframe_count.normalize(n);
        // Constant values and payload offsets are both single 32-bit words.
        self.data.normalize(n);
        if TrackKind::from_raw(kind) == Recognized::Known(TrackKind::ClusterWeight) {
            swap_chunks(&mut self.param, 4, n);
        } else {
            swap_chunks(&mut self.param, 2, n);
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct KeyRecord {
    pub time: f32,
    pub value: f32,
}

normalize_fields!(KeyRecord { time, value });

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BezierKeyRecord {
    pub time: f32,
    pub value: f32,
    pub in_slope: f32,
    pub out_slope: f32,
}

normalize_fields!(BezierKeyRecord {
    time,
    value,
    in_slope,
    out_slope
});

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BitmapKeyRecord {
    pub time: f32,
    pub bitmap: u32,
}

normalize_fields!(BitmapKeyRecord { time, bitmap });
