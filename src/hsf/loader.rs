//! Section-by-section loading.
//!
//! Each section is handled in two steps. First its records and trailing
//! payloads are read through the [`WorkingImage`] inside one normalization
//! session. Then the host-order records are relocated: names are looked up in
//! the string table, offsets are resolved against the section's data base and
//! stored indices are checked against the header counts.

use bytemuck::Pod;
use rootcause::Report;
use tracing::{debug, trace, warn};

use crate::data::endian::Normalize;
use crate::data::image::WorkingImage;
use crate::data::parser_utils::{ABSENT, read_null_terminated, region_end, resolve_offset, try_vec};
use crate::error::LoadError;
use crate::hsf::LoadOptions;
use crate::hsf::format::*;
use crate::hsf::names::Name;
use crate::hsf::types::*;
use crate::hsf::{envelope, graph, motion};

/// State threaded through one load. Nothing here outlives the call that
/// created it, so concurrent loads never share anything.
pub(crate) struct LoadContext<'a> {
    pub(crate) data: &'a [u8],
    pub(crate) image: WorkingImage<'a>,
    pub(crate) header: Header,
    pub(crate) symbols: Vec<u32>,
    pub(crate) strict_root: bool,
}

impl<'a> LoadContext<'a> {
    fn new(data: &'a [u8], header: Header, options: &LoadOptions) -> Self {
        Self {
            data,
            image: WorkingImage::new(data, options.byte_order),
            header,
            symbols: Vec::new(),
            strict_root: options.strict_root,
        }
    }

    // ----- names -----

    fn string_at(&self, offset: usize) -> Result<Name<'a>, Report<LoadError>> {
        let base = self.header.entry(Section::String).offset();
        let absolute = base.checked_add(offset).ok_or_else(|| {
            Report::new(LoadError::OutOfBounds {
                offset: base,
                need: offset,
                have: 0,
            })
        })?;
        read_null_terminated(self.data, absolute).map(Name::new)
    }

    pub(crate) fn name(&self, stored: u32) -> Result<Name<'a>, Report<LoadError>> {
        if stored == ABSENT {
            return Ok(Name::default());
        }
        self.string_at(stored as usize)
    }

    pub(crate) fn optional_name(&self, stored: u32) -> Result<Option<Name<'a>>, Report<LoadError>> {
        if stored == ABSENT {
            return Ok(None);
        }
        self.string_at(stored as usize).map(Some)
    }

    /// Motion tracks store 16-bit string table offsets.
    pub(crate) fn short_name(&self, stored: u16) -> Result<Name<'a>, Report<LoadError>> {
        self.string_at(stored as usize)
    }

    // ----- indices -----

    /// Check a stored table index. The absent sentinel becomes `None`.
    pub(crate) fn index<I: TableId>(&self, stored: u32) -> Result<Option<I>, Report<LoadError>> {
        if stored == ABSENT {
            return Ok(None);
        }
        let count = self.header.count(I::SECTION);
        if (stored as usize) < count {
            Ok(Some(I::from_index(stored)))
        } else {
            Err(Report::new(LoadError::IndexOutOfRange {
                section: I::SECTION,
                index: stored,
                count,
            }))
        }
    }

    /// Like [`index`](Self::index), but a value outside the table is logged
    /// and dropped.
    pub(crate) fn loose_index<I: TableId>(&self, stored: u32) -> Option<I> {
        match self.index(stored) {
            Ok(found) => found,
            Err(report) => {
                warn!("ignoring reference: {report}");
                None
            }
        }
    }

    fn required_index<I: TableId>(&self, stored: u32) -> Result<I, Report<LoadError>> {
        self.index(stored)?.ok_or_else(|| {
            Report::new(LoadError::IndexOutOfRange {
                section: I::SECTION,
                index: stored,
                count: self.header.count(I::SECTION),
            })
        })
    }

    /// `count` consecutive symbol table entries starting at `start`.
    pub(crate) fn symbol_slice(&self, start: u32, count: usize) -> Result<&[u32], Report<LoadError>> {
        if count == 0 {
            return Ok(&[]);
        }
        let begin = start as usize;
        match begin.checked_add(count) {
            Some(end) if end <= self.symbols.len() => Ok(&self.symbols[begin..end]),
            _ => Err(Report::new(LoadError::SymbolOutOfRange {
                index: start.saturating_add(count as u32).saturating_sub(1),
                count: self.symbols.len(),
            })),
        }
    }

    /// Resolve a reference list stored through the symbol table: symbol index,
    /// then raw entry, then a checked index into the target table.
    pub(crate) fn indices_via_symbols<I: TableId>(
        &self,
        start: u32,
        count: usize,
    ) -> Result<Vec<I>, Report<LoadError>> {
        let entries = self.symbol_slice(start, count)?;
        let mut out = try_vec(entries.len(), I::SECTION)?;
        for raw in entries {
            out.push(self.required_index(*raw)?);
        }
        Ok(out)
    }

    /// [`indices_via_symbols`](Self::indices_via_symbols) for lists whose
    /// entries may be absent.
    pub(crate) fn optional_indices_via_symbols<I: TableId>(
        &self,
        start: u32,
        count: usize,
    ) -> Result<Vec<Option<I>>, Report<LoadError>> {
        let entries = self.symbol_slice(start, count)?;
        let mut out = try_vec(entries.len(), I::SECTION)?;
        for raw in entries {
            out.push(self.index(*raw)?);
        }
        Ok(out)
    }

    // ----- section reads -----

    /// Read a section's fixed records in one session.
    fn records<T: Pod + Normalize>(&mut self, section: Section) -> Result<Vec<T>, Report<LoadError>> {
        let entry = self.header.entry(section);
        if entry.is_empty() {
            return Ok(Vec::new());
        }
        self.image
            .session(|img| img.read_array(entry.offset(), entry.count(), section))
    }

    /// Base of the payload that trails `section`'s record array.
    pub(crate) fn data_base(&self, section: Section, record_size: usize) -> Result<usize, Report<LoadError>> {
        let entry = self.header.entry(section);
        region_end(entry.offset(), entry.count(), record_size)
    }

    fn load_symbols(&mut self) -> Result<(), Report<LoadError>> {
        self.symbols = self.records::<u32>(Section::Symbol)?;
        Ok(())
    }

    fn load_scenes(&mut self) -> Result<Vec<Scene>, Report<LoadError>> {
        let records = self.records::<SceneRecord>(Section::Scene)?;
        Ok(records
            .into_iter()
            .map(|r| Scene {
                fog_kind: r.fog_kind,
                start: r.start,
                end: r.end,
                color: r.color,
            })
            .collect())
    }

    /// Read a buffer section: an array of (name, count, data) headers whose
    /// elements follow the header array.
    fn load_buffers<T: Pod + Normalize>(
        &mut self,
        section: Section,
    ) -> Result<Vec<Buffer<'a, Vec<T>>>, Report<LoadError>> {
        let entry = self.header.entry(section);
        if entry.is_empty() {
            return Ok(Vec::new());
        }
        let data_base = self.data_base(section, BUFFER_SIZE)?;
        let raw = self.image.session(|img| {
            let records: Vec<BufferRecord> = img.read_array(entry.offset(), entry.count(), section)?;
            let mut out = try_vec(records.len(), section)?;
            for record in records {
                let data = match resolve_offset(data_base, record.data) {
                    Some(offset) => img.read_array::<T>(offset, record.len(), section)?,
                    None => Vec::new(),
                };
                out.push((record, data));
            }
            Ok::<_, Report<LoadError>>(out)
        })?;

        let mut buffers = try_vec(raw.len(), section)?;
        for (record, data) in raw {
            buffers.push(Buffer {
                name: self.name(record.name)?,
                data,
            });
        }
        Ok(buffers)
    }

    fn load_normals(&mut self) -> Result<Vec<NormalBuffer<'a>>, Report<LoadError>> {
        let skinned = !self.header.entry(Section::Envelope).is_empty();
        if skinned {
            Ok(self
                .load_buffers::<Vec3>(Section::Normal)?
                .into_iter()
                .map(|b| Buffer {
                    name: b.name,
                    data: NormalData::Float(b.data),
                })
                .collect())
        } else {
            Ok(self
                .load_buffers::<[i8; 3]>(Section::Normal)?
                .into_iter()
                .map(|b| Buffer {
                    name: b.name,
                    data: NormalData::Packed(b.data),
                })
                .collect())
        }
    }

    /// Faces of every buffer follow the buffer array. Strip payloads live
    /// after the last buffer's faces and are indexed in quads.
    fn load_faces(&mut self) -> Result<Vec<FaceBuffer<'a>>, Report<LoadError>> {
        let entry = self.header.entry(Section::Face);
        if entry.is_empty() {
            return Ok(Vec::new());
        }
        let face_base = self.data_base(Section::Face, BUFFER_SIZE)?;
        let raw = self.image.session(|img| {
            let records: Vec<BufferRecord> =
                img.read_array(entry.offset(), entry.count(), Section::Face)?;
            let strip_base = match records.last() {
                Some(last) => match resolve_offset(face_base, last.data) {
                    Some(start) => region_end(start, last.len(), FACE_SIZE)?,
                    None => face_base,
                },
                None => face_base,
            };

            let mut out = try_vec(records.len(), Section::Face)?;
            for record in records {
                let faces: Vec<FaceRecord> = match resolve_offset(face_base, record.data) {
                    Some(offset) => img.read_tagged_array(offset, record.len(), Section::Face)?,
                    None => Vec::new(),
                };
                let mut decoded = try_vec(faces.len(), Section::Face)?;
                for face in faces {
                    let quads = if face.is_strip() {
                        let offset = region_end(strip_base, face.strip_data() as usize, STRIP_QUAD_SIZE)?;
                        img.read_array::<[i16; 4]>(offset, face.strip_count() as usize, Section::Face)?
                    } else {
                        Vec::new()
                    };
                    decoded.push((face, quads));
                }
                out.push((record, decoded));
            }
            Ok::<_, Report<LoadError>>(out)
        })?;

        let mut buffers = try_vec(raw.len(), Section::Face)?;
        for (record, faces) in raw {
            let data = faces
                .into_iter()
                .map(|(face, quads)| {
                    let indices = if face.is_strip() {
                        FaceIndices::Strip {
                            head: face.rows,
                            quads,
                        }
                    } else {
                        FaceIndices::Fixed([face.rows[0], face.rows[1], face.rows[2], face.last_row()])
                    };
                    Face {
                        kind: face.kind,
                        material: face.material,
                        indices,
                        nbt: Vec3 {
                            x: face.nbt[0],
                            y: face.nbt[1],
                            z: face.nbt[2],
                        },
                    }
                })
                .collect();
            buffers.push(Buffer {
                name: self.name(record.name)?,
                data,
            });
        }
        Ok(buffers)
    }

    fn load_palettes(&mut self) -> Result<Vec<Palette<'a>>, Report<LoadError>> {
        let entry = self.header.entry(Section::Palette);
        if entry.is_empty() {
            return Ok(Vec::new());
        }
        let data_base = self.data_base(Section::Palette, PALETTE_SIZE)?;
        let raw = self.image.session(|img| {
            let records: Vec<PaletteRecord> =
                img.read_array(entry.offset(), entry.count(), Section::Palette)?;
            let mut out = try_vec(records.len(), Section::Palette)?;
            for record in records {
                let entries = match resolve_offset(data_base, record.data) {
                    Some(offset) => img.read_array::<u16>(offset, record.count as usize, Section::Palette)?,
                    None => Vec::new(),
                };
                out.push((record, entries));
            }
            Ok::<_, Report<LoadError>>(out)
        })?;

        let mut palettes = try_vec(raw.len(), Section::Palette)?;
        for (record, entries) in raw {
            palettes.push(Palette {
                name: self.name(record.name)?,
                kind: record.kind,
                entries,
            });
        }
        Ok(palettes)
    }

    /// Pixel data is byte-oriented and borrowed straight from the input.
    fn load_bitmaps(&mut self) -> Result<Vec<Bitmap<'a>>, Report<LoadError>> {
        let records = self.records::<BitmapRecord>(Section::Bitmap)?;
        let data_base = self.data_base(Section::Bitmap, BITMAP_SIZE)?;
        let mut bitmaps = try_vec(records.len(), Section::Bitmap)?;
        for record in records {
            let pixels = match resolve_offset(data_base, record.data) {
                Some(offset) => {
                    let len = record.pixel_bytes();
                    offset
                        .checked_add(len)
                        .and_then(|end| self.data.get(offset..end))
                        .ok_or_else(|| {
                            Report::new(LoadError::OutOfBounds {
                                offset,
                                need: len,
                                have: self.data.len().saturating_sub(offset),
                            })
                        })?
                }
                None => &[],
            };
            bitmaps.push(Bitmap {
                name: self.name(record.name)?,
                max_lod: record.max_lod,
                format: record.format,
                bits_per_pixel: record.bits_per_pixel,
                width: record.width,
                height: record.height,
                palette_size: record.palette_size,
                tint: record.tint,
                palette: self.index(record.palette)?,
                pixels,
            });
        }
        Ok(bitmaps)
    }

    fn load_materials(&mut self) -> Result<Vec<Material<'a>>, Report<LoadError>> {
        let records = self.records::<MaterialRecord>(Section::Material)?;
        let mut materials = try_vec(records.len(), Section::Material)?;
        for record in records {
            materials.push(Material {
                name: self.name(record.name)?,
                pass: record.pass,
                vertex_mode: record.vertex_mode,
                lit_color: record.lit_color,
                color: record.color,
                shadow_color: record.shadow_color,
                hilite_scale: record.hilite_scale,
                inv_alpha: record.inv_alpha,
                ref_alpha: record.ref_alpha,
                flags: record.flags,
                attributes: self
                    .indices_via_symbols(record.attributes, record.attribute_count as usize)?,
            });
        }
        Ok(materials)
    }

    fn load_attributes(&mut self) -> Result<Vec<Attribute<'a>>, Report<LoadError>> {
        let records = self.records::<AttributeRecord>(Section::Attribute)?;
        let mut attributes = try_vec(records.len(), Section::Attribute)?;
        for record in records {
            attributes.push(Attribute {
                name: self.optional_name(record.name)?,
                wrap_s: record.wrap_s,
                wrap_t: record.wrap_t,
                flags: record.flags,
                bitmap: self.index(record.bitmap)?,
            });
        }
        Ok(attributes)
    }

    fn load_objects(&mut self) -> Result<(Vec<Object<'a>>, Option<ObjectId>), Report<LoadError>> {
        let entry = self.header.entry(Section::Object);
        if entry.is_empty() {
            return Ok((Vec::new(), None));
        }
        let records: Vec<ObjectRecord> = self.image.session(|img| {
            img.read_tagged_array(entry.offset(), entry.count(), Section::Object)
        })?;
        graph::build_object_graph(self, &records)
    }

    fn load_skeleton(&mut self) -> Result<Vec<Joint<'a>>, Report<LoadError>> {
        let records = self.records::<SkeletonRecord>(Section::Skeleton)?;
        let mut joints = try_vec(records.len(), Section::Skeleton)?;
        for record in records {
            joints.push(Joint {
                name: self.name(record.name)?,
                transform: record.transform,
            });
        }
        Ok(joints)
    }

    /// Read `u16` lists addressed in 16-bit units from a section's data base.
    fn u16_lists<T: Pod + Normalize>(
        &mut self,
        section: Section,
        record_size: usize,
        locate: impl Fn(&T) -> (u32, usize),
    ) -> Result<Vec<(T, Vec<u16>)>, Report<LoadError>> {
        let entry = self.header.entry(section);
        if entry.is_empty() {
            return Ok(Vec::new());
        }
        let data_base = self.data_base(section, record_size)?;
        self.image.session(|img| {
            let records: Vec<T> = img.read_array(entry.offset(), entry.count(), section)?;
            let mut out = try_vec(records.len(), section)?;
            for record in records {
                let (start, count) = locate(&record);
                let list = if start == ABSENT || count == 0 {
                    Vec::new()
                } else {
                    let offset = region_end(data_base, start as usize, 2)?;
                    img.read_array::<u16>(offset, count, section)?
                };
                out.push((record, list));
            }
            Ok(out)
        })
    }

    fn load_parts(&mut self) -> Result<Vec<Part<'a>>, Report<LoadError>> {
        let raw = self.u16_lists::<PartRecord>(Section::Part, PART_SIZE, |r| {
            (r.vertex, r.count as usize)
        })?;
        let mut parts = try_vec(raw.len(), Section::Part)?;
        for (record, vertices) in raw {
            parts.push(Part {
                name: self.name(record.name)?,
                vertices,
            });
        }
        Ok(parts)
    }

    fn load_clusters(&mut self) -> Result<Vec<Cluster<'a>>, Report<LoadError>> {
        let records = self.records::<ClusterRecord>(Section::Cluster)?;
        let mut clusters = try_vec(records.len(), Section::Cluster)?;
        for record in records {
            clusters.push(Cluster {
                names: [
                    self.optional_name(record.names[0])?,
                    self.optional_name(record.names[1])?,
                ],
                target_name: self.optional_name(record.target_name)?,
                target: None,
                adjusted: record.adjusted != 0,
                part: self.index(record.part)?,
                index: record.index,
                weights: record.weights,
                kind: record.kind,
                flags: record.flags,
                vertices: self.optional_indices_via_symbols(record.vertex, record.vertex_count as usize)?,
            });
        }
        Ok(clusters)
    }

    fn load_shapes(&mut self) -> Result<Vec<Shape<'a>>, Report<LoadError>> {
        let records = self.records::<ShapeRecord>(Section::Shape)?;
        let mut shapes = try_vec(records.len(), Section::Shape)?;
        for record in records {
            shapes.push(Shape {
                name: self.name(record.name)?,
                vertices: self.indices_via_symbols(record.vertex, record.counts[1] as usize)?,
            });
        }
        Ok(shapes)
    }

    fn load_map_attributes(&mut self) -> Result<Vec<MapAttribute>, Report<LoadError>> {
        let raw = self.u16_lists::<MapAttributeRecord>(
            Section::MapAttribute,
            MAP_ATTRIBUTE_SIZE,
            |r| (r.data, r.data_len as usize),
        )?;
        Ok(raw
            .into_iter()
            .map(|(r, data)| MapAttribute {
                min_x: r.min_x,
                min_z: r.min_z,
                max_x: r.max_x,
                max_z: r.max_z,
                data,
            })
            .collect())
    }

    /// The matrix section is one block header followed by its matrices.
    fn load_matrices(&mut self) -> Result<Option<MatrixBlock>, Report<LoadError>> {
        let entry = self.header.entry(Section::Matrix);
        if entry.is_empty() {
            return Ok(None);
        }
        let block = self.image.session(|img| {
            let header: MatrixHeaderRecord = img.read(entry.offset())?;
            let matrices = img.read_array::<Matrix3x4>(
                entry.offset() + MATRIX_HEADER_SIZE,
                header.count as usize,
                Section::Matrix,
            )?;
            Ok::<_, Report<LoadError>>(MatrixBlock {
                base_index: header.base_index,
                matrices,
            })
        })?;
        Ok(Some(block))
    }
}

/// Run the full normalize, relocate and resolve sequence.
pub(crate) fn load<'a>(data: &'a [u8], options: &LoadOptions) -> Result<Model<'a>, Report<LoadError>> {
    let header = parse_header(data, options.byte_order, options.require_magic)?;
    debug!(
        version = header.version,
        order = ?options.byte_order,
        "loading HSF file ({} bytes)",
        data.len()
    );
    for section in Section::ALL {
        let entry = header.entry(section);
        if !entry.is_empty() {
            trace!("{section}: {} entries at 0x{:X}", entry.count, entry.offset);
        }
    }

    let mut ctx = LoadContext::new(data, header, options);
    ctx.load_symbols()?;

    let mut model = Model {
        version: ctx.header.version,
        byte_order: options.byte_order,
        ..Model::default()
    };

    model.scenes = ctx.load_scenes()?;
    model.colors = ctx.load_buffers(Section::Color)?;
    model.palettes = ctx.load_palettes()?;
    model.bitmaps = ctx.load_bitmaps()?;
    model.materials = ctx.load_materials()?;
    model.attributes = ctx.load_attributes()?;
    model.vertices = ctx.load_buffers(Section::Vertex)?;
    model.normals = ctx.load_normals()?;
    model.texcoords = ctx.load_buffers(Section::TexCoord)?;
    model.faces = ctx.load_faces()?;
    let (objects, root) = ctx.load_objects()?;
    model.objects = objects;
    model.root = root;
    model.envelopes = envelope::load_envelopes(&mut ctx)?;
    model.skeleton = ctx.load_skeleton()?;
    model.parts = ctx.load_parts()?;
    model.clusters = ctx.load_clusters()?;
    model.shapes = ctx.load_shapes()?;
    model.map_attributes = ctx.load_map_attributes()?;

    let mut motions = motion::load_motions(&mut ctx)?;
    for motion in &mut motions {
        motion.retarget(&model);
    }
    model.motions = motions;
    model.matrices = ctx.load_matrices()?;

    debug!(
        objects = model.objects.len(),
        motions = model.motions.len(),
        "loaded HSF model"
    );
    Ok(model)
}
