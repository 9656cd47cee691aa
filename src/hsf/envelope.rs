//! Skin envelopes.
//!
//! All envelopes share one data region after the envelope array. Each
//! envelope's single, dual and multi binding tables are carved from it in
//! that order with a running cursor, and the weight tables for dual and multi
//! bindings live after every envelope's bindings.

use rootcause::Report;
use tracing::{debug, warn};

use crate::data::parser_utils::{ABSENT, region_end, resolve_offset, try_vec};
use crate::error::LoadError;
use crate::hsf::format::*;
use crate::hsf::loader::LoadContext;
use crate::hsf::types::{DualBinding, DualWeight, Envelope, MultiBinding, MultiWeight, SingleBinding, VertexSpan};

/// Byte positions of one envelope's binding tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeLayout {
    pub single: usize,
    pub dual: usize,
    pub multi: usize,
    /// First byte after the multi table; the next envelope's cursor.
    pub end: usize,
}

impl EnvelopeLayout {
    /// Carve single, dual and multi tables starting at `cursor`.
    pub fn carve(
        cursor: usize,
        single_count: usize,
        dual_count: usize,
        multi_count: usize,
    ) -> Result<Self, Report<LoadError>> {
        let dual = region_end(cursor, single_count, SINGLE_BINDING_SIZE)?;
        let multi = region_end(dual, dual_count, DUAL_BINDING_SIZE)?;
        let end = region_end(multi, multi_count, MULTI_BINDING_SIZE)?;
        Ok(Self {
            single: cursor,
            dual,
            multi,
            end,
        })
    }
}

fn span(start: u16, count: u16) -> VertexSpan {
    VertexSpan { start, count }
}

/// Compare a stored table offset with where carving put it.
fn check_stored(index: usize, table: &str, data_base: usize, stored: u32, carved: usize, count: u32) {
    if count == 0 || stored == ABSENT {
        return;
    }
    if resolve_offset(data_base, stored) != Some(carved) {
        warn!(
            envelope = index,
            "{table} bindings stored at +0x{stored:X}, carved at +0x{:X}",
            carved - data_base
        );
    }
}

struct RawEnvelope {
    record: EnvelopeRecord,
    singles: Vec<SingleBindingRecord>,
    duals: Vec<(DualBindingRecord, Vec<DualWeightRecord>)>,
    multis: Vec<(MultiBindingRecord, Vec<MultiWeightRecord>)>,
}

pub(crate) fn load_envelopes<'a>(ctx: &mut LoadContext<'a>) -> Result<Vec<Envelope<'a>>, Report<LoadError>> {
    let entry = ctx.header.entry(Section::Envelope);
    if entry.is_empty() {
        return Ok(Vec::new());
    }
    let data_base = ctx.data_base(Section::Envelope, ENVELOPE_SIZE)?;

    let raw = ctx.image.session(|img| {
        let records: Vec<EnvelopeRecord> =
            img.read_array(entry.offset(), entry.count(), Section::Envelope)?;

        let mut layouts = try_vec(records.len(), Section::Envelope)?;
        let mut cursor = data_base;
        for (i, record) in records.iter().enumerate() {
            let layout = EnvelopeLayout::carve(
                cursor,
                record.single_count as usize,
                record.dual_count as usize,
                record.multi_count as usize,
            )?;
            check_stored(i, "single", data_base, record.single_data, layout.single, record.single_count);
            check_stored(i, "dual", data_base, record.dual_data, layout.dual, record.dual_count);
            check_stored(i, "multi", data_base, record.multi_data, layout.multi, record.multi_count);
            cursor = layout.end;
            layouts.push(layout);
        }
        let weight_base = cursor;
        debug!(
            "envelope bindings at 0x{data_base:X}, weights at 0x{weight_base:X}"
        );

        let mut out = try_vec(records.len(), Section::Envelope)?;
        for (record, layout) in records.into_iter().zip(layouts) {
            let singles = img.read_array::<SingleBindingRecord>(
                layout.single,
                record.single_count as usize,
                Section::Envelope,
            )?;

            let dual_records = img.read_array::<DualBindingRecord>(
                layout.dual,
                record.dual_count as usize,
                Section::Envelope,
            )?;
            let mut duals = try_vec(dual_records.len(), Section::Envelope)?;
            for dual in dual_records {
                let weights = match resolve_offset(weight_base, dual.weight) {
                    Some(offset) => img.read_array::<DualWeightRecord>(
                        offset,
                        dual.weight_count as usize,
                        Section::Envelope,
                    )?,
                    None => Vec::new(),
                };
                duals.push((dual, weights));
            }

            let multi_records = img.read_array::<MultiBindingRecord>(
                layout.multi,
                record.multi_count as usize,
                Section::Envelope,
            )?;
            let mut multis = try_vec(multi_records.len(), Section::Envelope)?;
            for multi in multi_records {
                let weights = match resolve_offset(weight_base, multi.weight) {
                    Some(offset) => img.read_array::<MultiWeightRecord>(
                        offset,
                        multi.weight_count as usize,
                        Section::Envelope,
                    )?,
                    None => Vec::new(),
                };
                multis.push((multi, weights));
            }

            out.push(RawEnvelope {
                record,
                singles,
                duals,
                multis,
            });
        }
        Ok::<_, Report<LoadError>>(out)
    })?;

    let mut envelopes = try_vec(raw.len(), Section::Envelope)?;
    for env in raw {
        envelopes.push(Envelope {
            name: ctx.name(env.record.name)?,
            singles: env
                .singles
                .into_iter()
                .map(|s| SingleBinding {
                    target: s.target,
                    positions: span(s.pos, s.pos_count),
                    normals: span(s.normal, s.normal_count),
                })
                .collect(),
            duals: env
                .duals
                .into_iter()
                .map(|(d, weights)| DualBinding {
                    targets: [d.target1, d.target2],
                    weights: weights
                        .into_iter()
                        .map(|w| DualWeight {
                            weight: w.weight,
                            positions: span(w.pos, w.pos_count),
                            normals: span(w.normal, w.normal_count),
                        })
                        .collect(),
                })
                .collect(),
            multis: env
                .multis
                .into_iter()
                .map(|(m, weights)| MultiBinding {
                    positions: span(m.pos, m.pos_count),
                    normals: span(m.normal, m.normal_count),
                    weights: weights
                        .into_iter()
                        .map(|w| MultiWeight {
                            target: w.target,
                            value: w.value,
                        })
                        .collect(),
                })
                .collect(),
            vertex_count: env.record.vertex_count,
            copy_count: env.record.copy_count,
        });
    }
    Ok(envelopes)
}
