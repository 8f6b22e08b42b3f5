//! Ward sections.

use serde::{Deserialize, Serialize};

/// One of the four fixed wards a roster is grouped by.
///
/// Rehab is its own section, not a filter over the others.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    #[default]
    SideA,
    SideB,
    SideC,
    Rehab,
}

impl Section {
    /// All sections in display order.
    pub const ALL: [Section; 4] = [
        Section::SideA,
        Section::SideB,
        Section::SideC,
        Section::Rehab,
    ];

    /// Stable wire code, identical to the serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Self::SideA => "SIDE_A",
            Self::SideB => "SIDE_B",
            Self::SideC => "SIDE_C",
            Self::Rehab => "REHAB",
        }
    }

    /// Hebrew label as written on ward sheets.
    pub fn label(self) -> &'static str {
        match self {
            Self::SideA => "צד א",
            Self::SideB => "צד ב",
            Self::SideC => "צד ג",
            Self::Rehab => "שיקום",
        }
    }

    /// Parses a wire code (`SIDE_A`) case-insensitively.
    pub fn from_code(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|section| section.code().eq_ignore_ascii_case(trimmed))
    }

    /// Detects a section header line.
    ///
    /// Matching is substring containment after all whitespace is removed, so
    /// `"  צד   א  "` and `"--- צדא ---"` both resolve to [`Section::SideA`].
    ///
    /// The token may sit anywhere in the line, `|` segments included: a
    /// patient row that mentions a ward label is read as that ward's header,
    /// not as a patient.
    pub fn detect_header(line: &str) -> Option<Self> {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL.into_iter().find(|section| {
            let token: String = section
                .label()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            compact.contains(token.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Section;

    #[test]
    fn detect_header_tolerates_spacing() {
        assert_eq!(Section::detect_header("צד א"), Some(Section::SideA));
        assert_eq!(Section::detect_header("  צד   ב :"), Some(Section::SideB));
        assert_eq!(Section::detect_header("צדג"), Some(Section::SideC));
        assert_eq!(Section::detect_header("מחלקת שיקום"), Some(Section::Rehab));
        assert_eq!(Section::detect_header("101 כהן יוסף 72"), None);
    }

    #[test]
    fn ward_label_inside_a_patient_row_makes_it_a_header() {
        assert_eq!(
            Section::detect_header("101 כהן יוסף 72 | שיקום"),
            Some(Section::Rehab)
        );
        assert_eq!(
            Section::detect_header("202 לוי שרה | הועברה מצד א"),
            Some(Section::SideA)
        );
    }

    #[test]
    fn from_code_is_case_insensitive() {
        assert_eq!(Section::from_code("side_c"), Some(Section::SideC));
        assert_eq!(Section::from_code(" REHAB "), Some(Section::Rehab));
        assert_eq!(Section::from_code("ICU"), None);
    }
}
