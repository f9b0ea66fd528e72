//! CRL nomenclature.
//!
//! `{PREFIX}-{MANUAL}-{SECTION}.{ext}` for the only image of a section,
//! `{PREFIX}-{MANUAL}-{SECTION} n_{K}.{ext}` for each of several.

use std::collections::{BTreeMap, HashMap};

use crate::model::ImageFormat;

/// Section key of images no section claims.
///
/// A heading numbered "0" maps to the same key, and its images are counted
/// together with the unassociated ones.
pub const UNASSOCIATED: &str = "0";

/// Default filename prefix.
pub const DEFAULT_PREFIX: &str = "CRL";

/// Final name of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedName {
    /// Output filename
    pub filename: String,
    /// 1-based position within the section
    pub counter: usize,
    /// Number of images in the section
    pub total: usize,
}

/// Filename grammar for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nomenclature {
    prefix: String,
    manual: String,
}

impl Nomenclature {
    /// Path separators in either part are replaced by `-`.
    pub fn new(prefix: impl Into<String>, manual: impl Into<String>) -> Self {
        Self {
            prefix: sanitize(&prefix.into()),
            manual: sanitize(&manual.into()),
        }
    }

    /// The prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The manual name.
    pub fn manual(&self) -> &str {
        &self.manual
    }

    /// Filename for one image. `counter` is `None` for a section's only image.
    pub fn filename(&self, section: &str, counter: Option<usize>, format: ImageFormat) -> String {
        match counter {
            Some(k) => format!(
                "{}-{}-{} n_{}.{}",
                self.prefix,
                self.manual,
                section,
                k,
                format.extension()
            ),
            None => format!("{}-{}-{}.{}", self.prefix, self.manual, section, format.extension()),
        }
    }

    /// Name every image once all associations are known.
    ///
    /// `images` is (section key, format) in discovery order. Counts are taken
    /// over the whole slice first, so the suffix decision never changes after
    /// a name is handed out.
    pub fn assign(&self, images: &[(String, ImageFormat)]) -> Vec<AssignedName> {
        let totals = section_counts(images.iter().map(|(s, _)| s.as_str()));

        let mut seen: HashMap<&str, usize> = HashMap::new();
        images
            .iter()
            .map(|(section, format)| {
                let counter = seen.entry(section.as_str()).or_insert(0);
                *counter += 1;
                let total = totals[section.as_str()];
                let suffix = (total > 1).then_some(*counter);
                AssignedName {
                    filename: self.filename(section, suffix, *format),
                    counter: *counter,
                    total,
                }
            })
            .collect()
    }
}

impl Default for Nomenclature {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, super::manual::DEFAULT_MANUAL_NAME)
    }
}

/// Images per section key.
pub fn section_counts<'a>(sections: impl IntoIterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for section in sections {
        *counts.entry(section).or_insert(0) += 1;
    }
    counts
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(sections: &[&str]) -> Vec<(String, ImageFormat)> {
        sections.iter().map(|s| (s.to_string(), ImageFormat::Png)).collect()
    }

    #[test]
    fn test_single_image_has_no_suffix() {
        let names = Nomenclature::new("CRL", "PROCSG02").assign(&keys(&["2.4"]));
        assert_eq!(names[0].filename, "CRL-PROCSG02-2.4.png");
        assert_eq!(names[0].counter, 1);
        assert_eq!(names[0].total, 1);
    }

    #[test]
    fn test_every_image_of_a_shared_section_is_suffixed() {
        let names = Nomenclature::new("CRL", "M").assign(&keys(&["1.1", "1.2", "1.1", "0", "1.1"]));
        let files: Vec<&str> = names.iter().map(|n| n.filename.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "CRL-M-1.1 n_1.png",
                "CRL-M-1.2.png",
                "CRL-M-1.1 n_2.png",
                "CRL-M-0.png",
                "CRL-M-1.1 n_3.png",
            ]
        );
    }

    #[test]
    fn test_separators_are_sanitized() {
        let n = Nomenclature::new("CRL", "OMA/STC");
        assert_eq!(n.filename("3", None, ImageFormat::Jpeg), "CRL-OMA-STC-3.jpg");
    }

    #[test]
    fn test_section_counts() {
        let counts = section_counts(["1", "0", "1"]);
        assert_eq!(counts.get("1"), Some(&2));
        assert_eq!(counts.get("0"), Some(&1));
    }
}
