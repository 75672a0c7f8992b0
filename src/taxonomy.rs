use std::fmt;

use serde::Serialize;

/// Canonical cognitive-status labels the published checkpoints predict over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassLabel {
    #[serde(rename = "CN")]
    Cn,
    #[serde(rename = "AD")]
    Ad,
    #[serde(rename = "FTD")]
    Ftd,
}

impl ClassLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cn => "CN",
            Self::Ad => "AD",
            Self::Ftd => "FTD",
        }
    }

    /// Normalizes caller-supplied labels: case folded, single-letter codes
    /// (`C`/`A`/`F`) expanded. Unknown strings return `None` rather than
    /// erroring so out-of-taxonomy ground truth degrades to "absent".
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CN" | "C" => Some(Self::Cn),
            "AD" | "A" => Some(Self::Ad),
            "FTD" | "F" => Some(Self::Ftd),
            _ => None,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TWO_CLASS: [ClassLabel; 2] = [ClassLabel::Cn, ClassLabel::Ad];
const THREE_CLASS: [ClassLabel; 3] = [ClassLabel::Cn, ClassLabel::Ad, ClassLabel::Ftd];

/// Ordered output-class set of a model variant. The order is the index
/// order of the checkpoint's classifier head and must never be permuted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassTaxonomy {
    TwoClass,
    ThreeClass,
}

impl ClassTaxonomy {
    pub fn labels(self) -> &'static [ClassLabel] {
        match self {
            Self::TwoClass => &TWO_CLASS,
            Self::ThreeClass => &THREE_CLASS,
        }
    }

    pub fn len(self) -> usize {
        self.labels().len()
    }

    pub fn is_empty(self) -> bool {
        false
    }

    pub fn label(self, index: usize) -> Option<ClassLabel> {
        self.labels().get(index).copied()
    }

    /// Index of a label within this taxonomy, `None` when the label is not
    /// part of it (e.g. FTD against the two-class set).
    pub fn index_of(self, label: ClassLabel) -> Option<usize> {
        self.labels().iter().position(|&l| l == label)
    }

    /// Normalizes a raw ground-truth string against this taxonomy.
    pub fn normalize_label(self, raw: &str) -> Option<ClassLabel> {
        ClassLabel::normalize(raw).filter(|&l| self.index_of(l).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_codes_expand() {
        assert_eq!(ClassLabel::normalize("C"), Some(ClassLabel::Cn));
        assert_eq!(ClassLabel::normalize("a"), Some(ClassLabel::Ad));
        assert_eq!(ClassLabel::normalize(" ftd "), Some(ClassLabel::Ftd));
        assert_eq!(ClassLabel::normalize("MCI"), None);
    }

    #[test]
    fn out_of_taxonomy_label_normalizes_to_absent() {
        assert_eq!(ClassTaxonomy::TwoClass.normalize_label("FTD"), None);
        assert_eq!(
            ClassTaxonomy::ThreeClass.normalize_label("F"),
            Some(ClassLabel::Ftd)
        );
    }

    #[test]
    fn index_label_mapping_is_bidirectional() {
        for taxonomy in [ClassTaxonomy::TwoClass, ClassTaxonomy::ThreeClass] {
            for (i, &label) in taxonomy.labels().iter().enumerate() {
                assert_eq!(taxonomy.index_of(label), Some(i));
                assert_eq!(taxonomy.label(i), Some(label));
            }
        }
    }
}
