//! Specimen grouper: a relational join of organism identifications and
//! phenotype findings onto the susceptibility rows of the same specimen.
//! Inputs are never back-patched in place; the join produces new rows.

use std::collections::{BTreeMap, BTreeSet};

use amr_core::models::{ClassificationInput, Designator, PhenotypeFlag, SpecimenRef};

/// Marker set on duplicated rows when a specimen grew several organisms and
/// a susceptibility row named none of them.
pub const AMBIGUOUS_ORGANISM_KEY: &str = "ambiguous-organism";

/// Group inputs by specimen, merge organism and phenotype context into each
/// susceptibility row, and drop the carrier rows.
///
/// Rows without a specimen get a synthetic reference derived from their
/// position. Susceptibility rows keep their payload order; a row duplicated
/// for organism ambiguity emits its copies adjacently.
pub fn group_inputs(inputs: Vec<ClassificationInput>) -> Vec<ClassificationInput> {
    let with_specimens: Vec<ClassificationInput> = inputs
        .into_iter()
        .enumerate()
        .map(|(position, mut input)| {
            if input.specimen.is_none() {
                input.specimen = Some(SpecimenRef::synthetic(position));
            }
            input
        })
        .collect();

    // Per-specimen organism identifications and phenotype flags.
    let mut organisms: BTreeMap<SpecimenRef, Vec<Designator>> = BTreeMap::new();
    let mut phenotypes: BTreeMap<SpecimenRef, BTreeSet<PhenotypeFlag>> = BTreeMap::new();

    for input in &with_specimens {
        let specimen = match &input.specimen {
            Some(specimen) => specimen.clone(),
            None => continue,
        };
        let flags = phenotypes.entry(specimen.clone()).or_default();
        flags.extend(input.phenotypes.iter().copied());

        if input.is_carrier() {
            if let Some(organism) = &input.organism {
                let known = organisms.entry(specimen).or_default();
                if !known
                    .iter()
                    .any(|existing| existing.raw().eq_ignore_ascii_case(&organism.raw()))
                {
                    known.push(organism.clone());
                }
            }
        }
    }

    let mut grouped: Vec<ClassificationInput> = Vec::with_capacity(with_specimens.len());
    for input in with_specimens {
        if input.is_carrier() {
            continue;
        }
        let specimen = input.specimen.clone();
        let specimen_flags = specimen
            .as_ref()
            .and_then(|s| phenotypes.get(s))
            .cloned()
            .unwrap_or_default();

        let mut merged = input;
        merged.phenotypes.extend(specimen_flags);

        if merged.organism.is_some() {
            grouped.push(merged);
            continue;
        }

        let candidates = specimen
            .as_ref()
            .and_then(|s| organisms.get(s))
            .cloned()
            .unwrap_or_default();
        match candidates.len() {
            0 => grouped.push(merged),
            1 => {
                merged.organism = Some(candidates[0].clone());
                grouped.push(merged);
            }
            _ => {
                tracing::warn!(
                    specimen = specimen.as_ref().map(|s| s.as_str()).unwrap_or(""),
                    organisms = candidates.len(),
                    "ambiguous organism context, duplicating susceptibility row"
                );
                for organism in candidates {
                    let mut duplicate = merged.clone();
                    duplicate.organism = Some(organism);
                    duplicate
                        .auxiliary
                        .insert(AMBIGUOUS_ORGANISM_KEY.to_string(), "true".to_string());
                    grouped.push(duplicate);
                }
            }
        }
    }

    grouped
}
