use crate::utils::constants::UNKNOWN_COUNTY;
use crate::utils::fold_cedillas;
use std::collections::HashMap;
use std::sync::OnceLock;

/// The 41 counties plus the capital, in canonical spelling
pub const COUNTIES: [&str; 42] = [
    "Alba",
    "Arad",
    "Arges",
    "Bacau",
    "Bihor",
    "Bistrita-Nasaud",
    "Botosani",
    "Brasov",
    "Braila",
    "Buzau",
    "Caras-Severin",
    "Calarasi",
    "Cluj",
    "Constanta",
    "Covasna",
    "Dambovita",
    "Dolj",
    "Galati",
    "Giurgiu",
    "Gorj",
    "Harghita",
    "Hunedoara",
    "Ialomita",
    "Iasi",
    "Ilfov",
    "Maramures",
    "Mehedinti",
    "Mures",
    "Neamt",
    "Olt",
    "Prahova",
    "Satu Mare",
    "Salaj",
    "Sibiu",
    "Suceava",
    "Teleorman",
    "Timis",
    "Tulcea",
    "Vaslui",
    "Valcea",
    "Vrancea",
    "Bucharest",
];

/// Uppercase spellings seen in source tables that differ from the
/// canonical name
const ALIASES: &[(&str, &str)] = &[
    ("BUCURESTI", "Bucharest"),
    ("BUCUREȘTI", "Bucharest"),
    ("MUNICIPIUL BUCURESTI", "Bucharest"),
    ("MUNICIPIUL BUCUREȘTI", "Bucharest"),
    ("CARAS SEVERIN", "Caras-Severin"),
    ("CARAȘ-SEVERIN", "Caras-Severin"),
    ("BISTRITA NASAUD", "Bistrita-Nasaud"),
    ("BISTRIȚA-NĂSĂUD", "Bistrita-Nasaud"),
    ("SATU-MARE", "Satu Mare"),
    ("ARGEȘ", "Arges"),
    ("BACĂU", "Bacau"),
    ("BOTOȘANI", "Botosani"),
    ("BRAȘOV", "Brasov"),
    ("BRĂILA", "Braila"),
    ("BUZĂU", "Buzau"),
    ("CĂLĂRAȘI", "Calarasi"),
    ("CONSTANȚA", "Constanta"),
    ("DÂMBOVIȚA", "Dambovita"),
    ("GALAȚI", "Galati"),
    ("IALOMIȚA", "Ialomita"),
    ("IAȘI", "Iasi"),
    ("MARAMUREȘ", "Maramures"),
    ("MEHEDINȚI", "Mehedinti"),
    ("MUREȘ", "Mures"),
    ("NEAMȚ", "Neamt"),
    ("SĂLAJ", "Salaj"),
    ("TIMIȘ", "Timis"),
    ("VÂLCEA", "Valcea"),
];

fn name_table() -> &'static HashMap<String, &'static str> {
    static TABLE: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: HashMap<String, &'static str> = COUNTIES
            .iter()
            .map(|&name| (name.to_uppercase(), name))
            .collect();
        for &(alias, canonical) in ALIASES {
            table.insert(alias.to_string(), canonical);
        }
        table
    })
}

/// Canonical county name for a raw source value.
///
/// Missing or blank input is `Unknown`. Names absent from the lookup table
/// come back trimmed but otherwise verbatim, so they never merge into a
/// canonical bucket.
pub fn normalize_county_name(raw: Option<&str>) -> String {
    let trimmed = match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return UNKNOWN_COUNTY.to_string(),
    };

    match name_table().get(&lookup_key(trimmed)) {
        Some(canonical) => canonical.to_string(),
        None => trimmed.to_string(),
    }
}

fn lookup_key(name: &str) -> String {
    fold_cedillas(&name.to_uppercase())
}

pub fn is_canonical(name: &str) -> bool {
    COUNTIES.contains(&name)
}
