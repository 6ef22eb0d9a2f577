//! Offline terminology tables: recognized code systems, coded concepts, and
//! display aliases. These seed the normalizer so the engine keeps working
//! when no oracle is configured or reachable.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Code systems the coded-lookup step recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSystem {
    Snomed,
    Loinc,
    Atc,
    RxNorm,
}

/// Identify a code system from its canonical URI or a common shorthand.
pub fn recognize_system(system: &str) -> Option<CodeSystem> {
    match system.trim().to_ascii_lowercase().as_str() {
        "http://snomed.info/sct" | "snomed" | "sct" | "snomed-ct" => Some(CodeSystem::Snomed),
        "http://loinc.org" | "loinc" => Some(CodeSystem::Loinc),
        "http://www.whocc.no/atc" | "atc" => Some(CodeSystem::Atc),
        "http://www.nlm.nih.gov/research/umls/rxnorm" | "rxnorm" => Some(CodeSystem::RxNorm),
        _ => None,
    }
}

/// SNOMED CT organism concepts.
const SNOMED_ORGANISMS: &[(&str, &str)] = &[
    ("112283007", "Escherichia coli"),
    ("3092008", "Staphylococcus aureus"),
    ("115329001", "Staphylococcus aureus"),
    ("9875009", "Pseudomonas aeruginosa"),
    ("40886007", "Klebsiella pneumoniae"),
    ("85729005", "Enterococcus faecium"),
    ("78006001", "Enterococcus faecalis"),
    ("5595000", "Acinetobacter baumannii"),
    ("14385002", "Enterobacter cloacae"),
    ("6265002", "Citrobacter freundii"),
    ("73457008", "Proteus mirabilis"),
    ("33522002", "Serratia marcescens"),
    ("9861002", "Streptococcus pneumoniae"),
    ("44470000", "Haemophilus influenzae"),
];

/// ATC antibiotic concepts.
const ATC_ANTIBIOTICS: &[(&str, &str)] = &[
    ("J01CE01", "Benzylpenicillin"),
    ("J01CA01", "Ampicillin"),
    ("J01CA04", "Amoxicillin"),
    ("J01CA12", "Piperacillin"),
    ("J01CR02", "Amoxicillin-clavulanic acid"),
    ("J01CR05", "Piperacillin-tazobactam"),
    ("J01CF02", "Cloxacillin"),
    ("J01CF04", "Oxacillin"),
    ("J01DB04", "Cefazolin"),
    ("J01DC01", "Cefoxitin"),
    ("J01DC02", "Cefuroxime"),
    ("J01DD01", "Cefotaxime"),
    ("J01DD02", "Ceftazidime"),
    ("J01DD04", "Ceftriaxone"),
    ("J01DE01", "Cefepime"),
    ("J01DF01", "Aztreonam"),
    ("J01DH02", "Meropenem"),
    ("J01DH03", "Ertapenem"),
    ("J01DH04", "Doripenem"),
    ("J01DH51", "Imipenem"),
    ("J01DI01", "Ceftobiprole"),
    ("J01DI02", "Ceftaroline"),
    ("J01EE01", "Trimethoprim-sulfamethoxazole"),
    ("J01FA01", "Erythromycin"),
    ("J01FF01", "Clindamycin"),
    ("J01GB03", "Gentamicin"),
    ("J01GB06", "Amikacin"),
    ("J01MA02", "Ciprofloxacin"),
    ("J01MA12", "Levofloxacin"),
    ("J01XA01", "Vancomycin"),
    ("J01XA02", "Teicoplanin"),
    ("J01XE01", "Nitrofurantoin"),
    ("J01XX01", "Fosfomycin"),
    ("J01XX08", "Linezolid"),
    ("J01XX09", "Daptomycin"),
    ("J01AA12", "Tigecycline"),
];

/// Display aliases for organisms, keyed by normalized text. Includes the
/// HL7 v2 short codes labs commonly put in OBX values.
const ORGANISM_ALIASES: &[(&str, &str)] = &[
    ("e coli", "Escherichia coli"),
    ("ecoli", "Escherichia coli"),
    ("esch coli", "Escherichia coli"),
    ("s aureus", "Staphylococcus aureus"),
    ("staph aureus", "Staphylococcus aureus"),
    ("saur", "Staphylococcus aureus"),
    ("mrsa", "Staphylococcus aureus"),
    ("mssa", "Staphylococcus aureus"),
    ("p aeruginosa", "Pseudomonas aeruginosa"),
    ("paer", "Pseudomonas aeruginosa"),
    ("k pneumoniae", "Klebsiella pneumoniae"),
    ("kpne", "Klebsiella pneumoniae"),
    ("e faecalis", "Enterococcus faecalis"),
    ("efae", "Enterococcus faecalis"),
    ("e faecium", "Enterococcus faecium"),
    ("efam", "Enterococcus faecium"),
    ("vre", "Enterococcus faecium"),
    ("a baumannii", "Acinetobacter baumannii"),
    ("abau", "Acinetobacter baumannii"),
    ("p mirabilis", "Proteus mirabilis"),
    ("s pneumoniae", "Streptococcus pneumoniae"),
    ("h influenzae", "Haemophilus influenzae"),
];

/// Display aliases for antibiotics, including HL7 v2 antimicrobial codes.
const ANTIBIOTIC_ALIASES: &[(&str, &str)] = &[
    ("pen", "Benzylpenicillin"),
    ("penicillin", "Benzylpenicillin"),
    ("penicillin g", "Benzylpenicillin"),
    ("amp", "Ampicillin"),
    ("amx", "Amoxicillin"),
    ("amo", "Amoxicillin"),
    ("amc", "Amoxicillin-clavulanic acid"),
    ("amoxicillin/clavulanic acid", "Amoxicillin-clavulanic acid"),
    ("amoxicillin-clavulanate", "Amoxicillin-clavulanic acid"),
    ("co-amoxiclav", "Amoxicillin-clavulanic acid"),
    ("pip", "Piperacillin"),
    ("tzp", "Piperacillin-tazobactam"),
    ("piperacillin/tazobactam", "Piperacillin-tazobactam"),
    ("oxa", "Oxacillin"),
    ("fox", "Cefoxitin"),
    ("czo", "Cefazolin"),
    ("cxm", "Cefuroxime"),
    ("ctx", "Cefotaxime"),
    ("caz", "Ceftazidime"),
    ("cro", "Ceftriaxone"),
    ("fep", "Cefepime"),
    ("atm", "Aztreonam"),
    ("mem", "Meropenem"),
    ("etp", "Ertapenem"),
    ("dor", "Doripenem"),
    ("ipm", "Imipenem"),
    ("cpt", "Ceftaroline"),
    ("bpr", "Ceftobiprole"),
    ("sxt", "Trimethoprim-sulfamethoxazole"),
    ("co-trimoxazole", "Trimethoprim-sulfamethoxazole"),
    ("trimethoprim/sulfamethoxazole", "Trimethoprim-sulfamethoxazole"),
    ("ery", "Erythromycin"),
    ("cli", "Clindamycin"),
    ("gen", "Gentamicin"),
    ("amk", "Amikacin"),
    ("cip", "Ciprofloxacin"),
    ("lvx", "Levofloxacin"),
    ("van", "Vancomycin"),
    ("tec", "Teicoplanin"),
    ("nit", "Nitrofurantoin"),
    ("fof", "Fosfomycin"),
    ("lzd", "Linezolid"),
    ("dap", "Daptomycin"),
    ("tgc", "Tigecycline"),
];

/// Tokens stripped during display normalization.
const QUALIFIER_TOKENS: &[&str] = &["sp", "spp", "species", "group", "complex"];

fn map_of(pairs: &'static [(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

fn snomed_organisms() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| map_of(SNOMED_ORGANISMS))
}

fn atc_antibiotics() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| map_of(ATC_ANTIBIOTICS))
}

fn organism_aliases() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| map_of(ORGANISM_ALIASES))
}

fn antibiotic_aliases() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| map_of(ANTIBIOTIC_ALIASES))
}

fn canonical_organisms() -> &'static HashMap<String, &'static str> {
    static MAP: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        SNOMED_ORGANISMS
            .iter()
            .map(|(_, name)| (name.to_lowercase(), *name))
            .collect()
    })
}

fn canonical_antibiotics() -> &'static HashMap<String, &'static str> {
    static MAP: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        ATC_ANTIBIOTICS
            .iter()
            .map(|(_, name)| (name.to_lowercase(), *name))
            .collect()
    })
}

/// Canonical organism name for a recognized (system, code) pair.
pub fn organism_by_code(system: CodeSystem, code: &str) -> Option<&'static str> {
    match system {
        CodeSystem::Snomed => snomed_organisms().get(code.trim()).copied(),
        _ => None,
    }
}

/// Canonical antibiotic name for a recognized (system, code) pair.
pub fn antibiotic_by_code(system: CodeSystem, code: &str) -> Option<&'static str> {
    match system {
        CodeSystem::Atc | CodeSystem::RxNorm => {
            atc_antibiotics().get(code.trim().to_ascii_uppercase().as_str()).copied()
        }
        _ => None,
    }
}

/// Whether a SNOMED code denotes an organism this engine knows offline.
pub fn is_known_organism_code(code: &str) -> bool {
    snomed_organisms().contains_key(code.trim())
}

/// Normalize display text: trim, lowercase, fold whitespace, strip
/// punctuation (hyphen and slash survive for drug combinations), drop
/// qualifier tokens like "sp." and "group".
pub fn normalize_display(display: &str) -> String {
    let cleaned: String = display
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '/' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !QUALIFIER_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical organism name for normalized display text.
pub fn organism_by_display(normalized: &str) -> Option<&'static str> {
    if let Some(name) = canonical_organisms().get(normalized) {
        return Some(name);
    }
    organism_aliases().get(normalized).copied()
}

/// Canonical antibiotic name for normalized display text.
pub fn antibiotic_by_display(normalized: &str) -> Option<&'static str> {
    if let Some(name) = canonical_antibiotics().get(normalized) {
        return Some(name);
    }
    antibiotic_aliases().get(normalized).copied()
}
