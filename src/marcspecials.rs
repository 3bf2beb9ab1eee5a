//! Fixed-field decoders: leader positions 6-7 and the 006/007/008 fields.
//!
//! These decoders run after per-field rule dispatch and emit
//! audience/medium/genre/language/type statements derived from the coded
//! positions MARC packs into the leader and the 00X fields. Decoded values
//! are local names; the transducer absolutizes them against the configured
//! MARC-specials vocabulary and deduplicates before emission.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::vocab::{properties, types};

lazy_static! {
    /// Broad material category by leader position 6.
    static ref BROAD_CATEGORY: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', types::LANGUAGE_MATERIAL);
        m.insert('t', types::LANGUAGE_MATERIAL);
        m.insert('c', types::NOTATED_MUSIC);
        m.insert('d', types::NOTATED_MUSIC);
        m.insert('e', types::CARTOGRAPHY);
        m.insert('f', types::CARTOGRAPHY);
        m.insert('g', types::MOVING_IMAGE);
        m.insert('i', types::AUDIO);
        m.insert('j', types::MUSICAL_AUDIO);
        m.insert('k', types::STILL_IMAGE);
        m.insert('m', types::SOFTWARE);
        m.insert('o', types::KIT);
        m.insert('p', types::MIXED_MATERIALS);
        m.insert('r', types::OBJECT);
        m
    };

    /// Detailed category by leader position 6; yields zero, one, or two
    /// further types alongside the broad category.
    static ref DETAILED_CATEGORY: HashMap<char, &'static [&'static str]> = {
        let mut m = HashMap::new();
        m.insert('e', &[types::CARTOGRAPHY, types::STILL_IMAGE][..]);
        m.insert('f', &[types::CARTOGRAPHY, types::STILL_IMAGE][..]);
        m.insert('g', &[types::MOVING_IMAGE][..]);
        m.insert('j', &[types::AUDIO][..]);
        m.insert('k', &[types::STILL_IMAGE][..]);
        m
    };

    static ref AUDIENCE: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "preschool");
        m.insert('b', "primary");
        m.insert('c', "pre-adolescent");
        m.insert('d', "adolescent");
        m.insert('e', "adult");
        m.insert('f', "specialized");
        m.insert('g', "general");
        m.insert('j', "juvenile");
        m
    };

    static ref MEDIUM: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "microfilm");
        m.insert('b', "microfiche");
        m.insert('c', "microopaque");
        m.insert('d', "large-print");
        m.insert('f', "braille");
        m.insert('o', "online");
        m.insert('q', "direct-electronic");
        m.insert('r', "regular-print-reproduction");
        m.insert('s', "electronic");
        m
    };

    static ref CONTENT: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "abstracts-summaries");
        m.insert('b', "bibliography");
        m.insert('c', "catalogs");
        m.insert('d', "dictionaries");
        m.insert('e', "encyclopedias");
        m.insert('f', "handbooks");
        m.insert('g', "legal-articles");
        m.insert('i', "indexes");
        m.insert('j', "patent-document");
        m.insert('k', "discographies");
        m.insert('l', "legislation");
        m.insert('m', "theses");
        m.insert('n', "surveys-of-literature");
        m.insert('o', "reviews");
        m.insert('p', "programmed-texts");
        m.insert('q', "filmographies");
        m.insert('r', "directories");
        m.insert('s', "statistics");
        m.insert('t', "technical-reports");
        m.insert('u', "standards-specifications");
        m.insert('v', "legal-cases-and-notes");
        m.insert('w', "law-reports-and-digests");
        m.insert('z', "treaties");
        m
    };

    static ref GOVT_PUBLICATION: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "autonomous-or-semi-autonomous-component");
        m.insert('c', "multilocal");
        m.insert('f', "federal-national");
        m.insert('i', "international-intergovernmental");
        m.insert('l', "local");
        m.insert('m', "multistate");
        m.insert('o', "government-publication");
        m.insert('s', "state-provincial");
        m.insert('z', "other");
        m
    };

    static ref LITERARY_FORM: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('0', "non-fiction");
        m.insert('1', "fiction");
        m.insert('d', "dramas");
        m.insert('e', "essays");
        m.insert('f', "novels");
        m.insert('h', "humor-satires-etc");
        m.insert('i', "letters");
        m.insert('j', "short-stories");
        m.insert('m', "mixed-forms");
        m.insert('p', "poetry");
        m.insert('s', "speeches");
        m
    };

    static ref BIOGRAPHICAL: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "autobiography");
        m.insert('b', "individual-biography");
        m.insert('c', "collective-biography");
        m.insert('d', "contains-biographical-information");
        m
    };

    /// Physical medium by 007 position 0 (category of material).
    static ref PHYSICAL_MEDIUM: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('a', "map");
        m.insert('d', "globe");
        m.insert('f', "tactile-material");
        m.insert('g', "projected-graphic");
        m.insert('h', "microform");
        m.insert('k', "nonprojected-graphic");
        m.insert('m', "motion-picture");
        m.insert('q', "notated-music");
        m.insert('r', "remote-sensing-image");
        m.insert('s', "sound-recording");
        m.insert('t', "text");
        m.insert('v', "videorecording");
        m
    };

    /// Electronic carrier by 007 position 1 when position 0 is `c`.
    static ref ELECTRONIC_CARRIER: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('b', "chip-cartridge");
        m.insert('c', "optical-disc-cartridge");
        m.insert('j', "magnetic-disk");
        m.insert('m', "magneto-optical-disc");
        m.insert('o', "optical-disc");
        m.insert('r', "online");
        m
    };
}

/// Language slice sentinels meaning unknown/undetermined/no content.
const LANGUAGE_SENTINELS: &[&str] = &["###", "   ", "mul", "und", "zxx", "|||"];

/// Decodes leader positions 6 and 7 into resource type local names.
///
/// Both category tables fire (the types are not mutually exclusive), and a
/// position 7 of `c` or `s` additionally yields `Collection`.
#[must_use]
pub fn decode_leader_types(leader: &str) -> Vec<&'static str> {
    let mut out = Vec::new();
    let chars: Vec<char> = leader.chars().collect();
    if let Some(&pos6) = chars.get(6) {
        if let Some(&broad) = BROAD_CATEGORY.get(&pos6) {
            out.push(broad);
        }
        if let Some(&detailed) = DETAILED_CATEGORY.get(&pos6) {
            for &t in detailed {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
    }
    if let Some(&pos7) = chars.get(7) {
        if pos7 == 'c' || pos7 == 's' {
            out.push(types::COLLECTION);
        }
    }
    out
}

/// Decodes the material positions shared by 008 and 006.
///
/// Positions are named in 008 terms; 006 carries the same data shifted
/// down by 17 (006 position 1 holds what 008 keeps at position 18).
fn decode_material_positions(chars: &[char], shift: usize) -> Vec<(&'static str, String)> {
    let at = |i: usize| chars.get(i - shift).copied().unwrap_or(' ');
    let mut out: Vec<(&'static str, String)> = Vec::new();

    if let Some(&v) = AUDIENCE.get(&at(22)) {
        out.push((properties::AUDIENCE, v.to_string()));
    }
    if let Some(&v) = MEDIUM.get(&at(23)) {
        out.push((properties::MEDIUM, v.to_string()));
    }
    for i in 24..28 {
        if let Some(&v) = CONTENT.get(&at(i)) {
            out.push(("content-type", v.to_string()));
        }
    }
    if let Some(&v) = GOVT_PUBLICATION.get(&at(28)) {
        out.push(("government-publication", v.to_string()));
    }
    if at(29) == '1' {
        out.push(("conference-publication", "true".to_string()));
    }
    if at(30) == '1' {
        out.push(("festschrift", "true".to_string()));
    }
    if let Some(&v) = LITERARY_FORM.get(&at(33)) {
        out.push((properties::GENRE, v.to_string()));
    }
    if let Some(&v) = BIOGRAPHICAL.get(&at(34)) {
        out.push(("biographical", v.to_string()));
    }

    out
}

/// Decodes the 008 field into (property local name, value) pairs.
///
/// Missing/blank positions and unknown codes yield nothing; the two-digit
/// year prefix is tolerated without emission even when malformed. The
/// 35-37 language slice is suppressed for the unknown sentinels.
#[must_use]
pub fn decode_008(text: &str) -> Vec<(&'static str, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = decode_material_positions(&chars, 0);

    if chars.len() >= 38 {
        let lang: String = chars[35..38].iter().collect();
        if !LANGUAGE_SENTINELS.contains(&lang.as_str())
            && lang.chars().all(|c| c.is_ascii_lowercase())
        {
            out.push((properties::LANGUAGE, lang));
        }
    }

    out
}

/// Decodes a 006 field (additional material characteristics).
///
/// Position 0 repeats the leader position 6 material code; positions 1-17
/// mirror 008 positions 18-34 for that material. Returns the extra
/// resource type local names and the decoded (property, value) pairs.
#[must_use]
pub fn decode_006(text: &str) -> (Vec<&'static str>, Vec<(&'static str, String)>) {
    let chars: Vec<char> = text.chars().collect();
    let mut types = Vec::new();
    if let Some(&pos0) = chars.first() {
        if let Some(&broad) = BROAD_CATEGORY.get(&pos0) {
            types.push(broad);
        }
        if let Some(&detailed) = DETAILED_CATEGORY.get(&pos0) {
            for &t in detailed {
                if !types.contains(&t) {
                    types.push(t);
                }
            }
        }
    }
    (types, decode_material_positions(&chars, 17))
}

/// Decodes a 007 field (physical description) into (property, value) pairs.
///
/// Position 0 is the category of material; for electronic resources
/// (`c`) position 1 refines the carrier, so `cr` reads as an online
/// resource.
#[must_use]
pub fn decode_007(text: &str) -> Vec<(&'static str, String)> {
    let chars: Vec<char> = text.chars().collect();
    match chars.first() {
        Some('c') => {
            let carrier = chars
                .get(1)
                .and_then(|c| ELECTRONIC_CARRIER.get(c))
                .copied()
                .unwrap_or("electronic-resource");
            vec![(properties::MEDIUM, carrier.to_string())]
        }
        Some(c) => PHYSICAL_MEDIUM
            .get(c)
            .map(|&v| vec![(properties::MEDIUM, v.to_string())])
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_e_s_yields_still_image_and_collection() {
        // position 6 = 'e', position 7 = 's'
        let leader = "01142ces 2200301 a 4500";
        let types = decode_leader_types(leader);
        assert!(types.contains(&"StillImage"));
        assert!(types.contains(&"Collection"));
        assert!(types.contains(&"Cartography"));
    }

    #[test]
    fn test_leader_book_monograph() {
        let leader = "01142cam 2200301 a 4500";
        let types = decode_leader_types(leader);
        assert_eq!(types, vec!["LanguageMaterial"]);
    }

    #[test]
    fn test_leader_short_string_tolerated() {
        assert!(decode_leader_types("01142").is_empty());
    }

    fn sample_008() -> String {
        // juvenile audience, fiction, English
        "920219s1993    caua   j      000 1 eng  ".to_string()
    }

    #[test]
    fn test_008_audience_genre_language() {
        let decoded = decode_008(&sample_008());
        assert!(decoded.contains(&("audience", "juvenile".to_string())));
        assert!(decoded.contains(&("genre", "fiction".to_string())));
        assert!(decoded.contains(&("language", "eng".to_string())));
    }

    #[test]
    fn test_008_language_sentinels_suppressed() {
        let mut text = sample_008();
        text.replace_range(35..38, "und");
        let decoded = decode_008(&text);
        assert!(!decoded.iter().any(|(p, _)| *p == "language"));

        text.replace_range(35..38, "|||");
        let decoded = decode_008(&text);
        assert!(!decoded.iter().any(|(p, _)| *p == "language"));
    }

    #[test]
    fn test_008_malformed_year_does_not_panic() {
        let decoded = decode_008("xx");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_006_types_and_shifted_positions() {
        // books form: audience (008/22) sits at 006/05, literary form
        // (008/33) at 006/16
        let (types, pairs) = decode_006("a    j          1 ");
        assert_eq!(types, vec!["LanguageMaterial"]);
        assert!(pairs.contains(&("audience", "juvenile".to_string())));
        assert!(pairs.contains(&("genre", "fiction".to_string())));
    }

    #[test]
    fn test_006_software_form() {
        let (types, pairs) = decode_006("m");
        assert_eq!(types, vec!["Software"]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_007_electronic_remote_is_online() {
        assert_eq!(decode_007("cr"), vec![("medium", "online".to_string())]);
        assert_eq!(
            decode_007("co"),
            vec![("medium", "optical-disc".to_string())]
        );
    }

    #[test]
    fn test_007_category_of_material() {
        assert_eq!(decode_007("h"), vec![("medium", "microform".to_string())]);
        assert_eq!(decode_007("vd"), vec![("medium", "videorecording".to_string())]);
        assert!(decode_007("").is_empty());
        assert!(decode_007("z").is_empty());
    }

    #[test]
    fn test_008_conference_flag() {
        let mut text = sample_008();
        text.replace_range(29..30, "1");
        let decoded = decode_008(&text);
        assert!(decoded.contains(&("conference-publication", "true".to_string())));
    }
}
