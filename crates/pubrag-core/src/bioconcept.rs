use serde::{Deserialize, Serialize};

use crate::types::Annotation;

/// Fixed annotation-type buckets. Any type not listed falls into `Variant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bioconcept {
    Gene,
    Species,
    Strain,
    Genus,
    CellLine,
    Disease,
    Chemical,
    Variant,
}

impl Bioconcept {
    pub fn classify(entity_type: &str) -> Self {
        let normalized: String = entity_type
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "gene" => Self::Gene,
            "species" => Self::Species,
            "strain" => Self::Strain,
            "genus" => Self::Genus,
            "cellline" => Self::CellLine,
            "disease" => Self::Disease,
            "chemical" => Self::Chemical,
            _ => Self::Variant,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioconceptCounts {
    pub genes: usize,
    pub species: usize,
    pub strains: usize,
    pub genus: usize,
    pub cell_lines: usize,
    pub diseases: usize,
    pub chemicals: usize,
    pub variants: usize,
}

impl BioconceptCounts {
    pub fn from_annotations(annotations: &[Annotation]) -> Self {
        let mut counts = Self::default();
        for ann in annotations {
            *counts.bucket_mut(Bioconcept::classify(&ann.entity_type)) += 1;
        }
        counts
    }

    pub fn get(&self, concept: Bioconcept) -> usize {
        match concept {
            Bioconcept::Gene => self.genes,
            Bioconcept::Species => self.species,
            Bioconcept::Strain => self.strains,
            Bioconcept::Genus => self.genus,
            Bioconcept::CellLine => self.cell_lines,
            Bioconcept::Disease => self.diseases,
            Bioconcept::Chemical => self.chemicals,
            Bioconcept::Variant => self.variants,
        }
    }

    pub fn total(&self) -> usize {
        self.genes
            + self.species
            + self.strains
            + self.genus
            + self.cell_lines
            + self.diseases
            + self.chemicals
            + self.variants
    }

    fn bucket_mut(&mut self, concept: Bioconcept) -> &mut usize {
        match concept {
            Bioconcept::Gene => &mut self.genes,
            Bioconcept::Species => &mut self.species,
            Bioconcept::Strain => &mut self.strains,
            Bioconcept::Genus => &mut self.genus,
            Bioconcept::CellLine => &mut self.cell_lines,
            Bioconcept::Disease => &mut self.diseases,
            Bioconcept::Chemical => &mut self.chemicals,
            Bioconcept::Variant => &mut self.variants,
        }
    }
}

const MISSING_ID: &str = "N/A";

/// Fill an annotation's ontology label/id from its raw infons when the
/// annotator did not supply them.
///
/// Genes use `NCBI Gene`, taxonomic types use `NCBI Taxonomy`, chemicals,
/// diseases and cell lines use `identifier`. Other types take an
/// `Identifier` infon, or every remaining infon value joined by `", "`.
pub fn resolve_identifier(ann: &mut Annotation) {
    if !ann.ontology_label.is_empty() && !ann.ontology_id.is_empty() {
        return;
    }
    let (label, id) = match Bioconcept::classify(&ann.entity_type) {
        Bioconcept::Gene => ("NCBI Gene", ann.infons.get("NCBI Gene").cloned()),
        Bioconcept::Species | Bioconcept::Strain | Bioconcept::Genus => {
            ("NCBI Taxonomy", ann.infons.get("NCBI Taxonomy").cloned())
        }
        Bioconcept::Chemical | Bioconcept::Disease | Bioconcept::CellLine => {
            ("identifier", ann.infons.get("identifier").cloned())
        }
        Bioconcept::Variant => {
            let id = ann.infons.get("Identifier").cloned().or_else(|| {
                let rest: Vec<&str> = ann
                    .infons
                    .iter()
                    .filter(|(k, _)| {
                        !matches!(
                            k.to_lowercase().as_str(),
                            "type" | "identifier" | "ncbi gene" | "ncbi taxonomy"
                        )
                    })
                    .map(|(_, v)| v.as_str())
                    .collect();
                (!rest.is_empty()).then(|| rest.join(", "))
            });
            ("Identifier", id)
        }
    };
    if ann.ontology_label.is_empty() {
        ann.ontology_label = label.to_string();
    }
    if ann.ontology_id.is_empty() {
        ann.ontology_id = id.unwrap_or_else(|| MISSING_ID.to_string());
    }
}
